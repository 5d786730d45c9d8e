use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::qm::models::QmRow;
use crate::qm::row::{normalize_row, RawRow};
use crate::qm::sheet_selector::{select_sheet, SheetError, SheetHint};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to open workbook: {0}")]
    WorkbookOpen(String),

    #[error("Failed to read sheet {sheet}: {msg}")]
    SheetRead { sheet: String, msg: String },

    #[error(transparent)]
    Sheet(#[from] SheetError),
}

/// Rows parsed from one worksheet
#[derive(Debug, Clone)]
pub struct QmSheet {
    pub sheet: String,
    pub rows: Vec<QmRow>,
}

/// Parser for QM performance workbooks (xlsx, xls, xlsb, ods)
///
/// # Expected Sheet Structure:
/// ```text
/// Row 1:  Header (Projekt | Agent | Soll | Perf | " " | Notizen | 1 | 2 | ... | 31)
/// Row 2+: One agent/project per row; day columns hold figures or status codes
/// ```
/// Column order is free; columns are matched by header name.
pub struct QmImporter {
    workbook_path: PathBuf,
}

impl QmImporter {
    pub fn new(workbook_path: impl Into<PathBuf>) -> Self {
        Self {
            workbook_path: workbook_path.into(),
        }
    }

    pub fn workbook_path(&self) -> &Path {
        &self.workbook_path
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Result<Vec<String>, ImportError> {
        let workbook = open_workbook_auto(&self.workbook_path)
            .map_err(|e| ImportError::WorkbookOpen(e.to_string()))?;
        Ok(workbook.sheet_names().to_owned())
    }

    /// Select a sheet per `hint` and parse it
    ///
    /// This is synchronous; async callers should wrap it in `spawn_blocking`.
    #[instrument(skip(self), fields(path = %self.workbook_path.display()))]
    pub fn import(&self, hint: &SheetHint) -> Result<QmSheet, ImportError> {
        let mut workbook = open_workbook_auto(&self.workbook_path)
            .map_err(|e| ImportError::WorkbookOpen(e.to_string()))?;

        let sheet_names = workbook.sheet_names().to_owned();
        debug!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

        let sheet = select_sheet(&sheet_names, hint)?;
        info!("Parsing sheet: {}", sheet);

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| ImportError::SheetRead {
                sheet: sheet.clone(),
                msg: e.to_string(),
            })?;

        let rows = parse_range(&range, &sheet);
        Ok(QmSheet { sheet, rows })
    }
}

/// Parse a worksheet range whose first non-empty row holds the headers
pub fn parse_range(range: &Range<Data>, sheet_name: &str) -> Vec<QmRow> {
    let mut lines = range
        .rows()
        .skip_while(|row| row.iter().all(|c| matches!(c, Data::Empty)));

    let headers: Vec<String> = match lines.next() {
        Some(header_row) => header_row.iter().map(header_name).collect(),
        None => {
            warn!("Sheet {} is empty", sheet_name);
            return Vec::new();
        }
    };
    debug!("Sheet {} headers: {:?}", sheet_name, headers);

    let mut rows = Vec::new();
    let mut dropped = 0;

    for line in lines {
        let raw = RawRow::from_cells(&headers, line);
        if raw.is_blank() {
            continue;
        }
        match normalize_row(&raw, sheet_name) {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!("Dropped {} rows without project and agent", dropped);
    }
    info!("Parsed {} rows from sheet {}", rows.len(), sheet_name);

    rows
}

/// Header text of a cell; whole numbers render without a fraction so day columns read "17"
fn header_name(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{f:.0}"),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}
