// QM (quality management) performance sheets
//
// Workbooks hold one sheet per reporting month ("Abschlüsse MM.YYYY"), one row per agent and
// project, with day columns 1-31 carrying either figures or absence/status codes.

pub mod cell;
pub mod importer;
pub mod models;
pub mod row;
pub mod sheet_selector;

pub use cell::{normalize_cell, normalize_text};
pub use importer::{parse_range, ImportError, QmImporter, QmSheet};
pub use models::{CellValue, QmDailyCell, QmRow};
pub use row::{normalize_row, RawRow};
pub use sheet_selector::{select_sheet, SheetError, SheetHint};
