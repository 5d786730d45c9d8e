use std::collections::HashMap;

use calamine::Data;

use crate::qm::cell::{normalize_cell, numeric_value, text_value};
use crate::qm::models::{QmDailyCell, QmRow, DAYS_PER_ROW};

const PROJECT_HEADER: &str = "projekt";
const AGENT_HEADER: &str = "agent";
const TARGET_HEADER: &str = "soll";
const PERF_HEADER: &str = "perf";
const NOTES_HEADER: &str = "notizen";
/// The attainment column is headed by a lone space in the source sheets
const ATTAINMENT_HEADER: &str = " ";

/// One worksheet row keyed by header name, case-insensitively
///
/// Header names are lowercased but not trimmed, so the single-space attainment header stays
/// addressable. When a header repeats, the leftmost column wins.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    cells: HashMap<String, Data>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from header names and the matching cells (zipped by position)
    pub fn from_cells<'a>(
        headers: &[String],
        cells: impl IntoIterator<Item = &'a Data>,
    ) -> Self {
        let mut row = Self::new();
        for (header, cell) in headers.iter().zip(cells) {
            row.insert(header, cell.clone());
        }
        row
    }

    /// Add a cell unless a column with the same (case-folded) header already exists
    pub fn insert(&mut self, header: &str, cell: Data) {
        if header.is_empty() {
            return;
        }
        self.cells.entry(header.to_lowercase()).or_insert(cell);
    }

    pub fn get(&self, header: &str) -> Option<&Data> {
        self.cells.get(&header.to_lowercase())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|c| matches!(c, Data::Empty))
    }
}

impl<S: AsRef<str>> FromIterator<(S, Data)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (S, Data)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (header, cell) in iter {
            row.insert(header.as_ref(), cell);
        }
        row
    }
}

/// Normalize a raw row into a [`QmRow`]
///
/// Returns `None` when both project and agent are blank; such rows are separators, totals or
/// leftovers and carry nothing attributable. Missing day columns count as blank cells.
pub fn normalize_row(raw: &RawRow, sheet_name: &str) -> Option<QmRow> {
    let project_name = text_value(raw.get(PROJECT_HEADER)).unwrap_or_default();
    let agent_name = text_value(raw.get(AGENT_HEADER)).unwrap_or_default();
    if project_name.is_empty() && agent_name.is_empty() {
        return None;
    }

    let mut achieved_sum = 0.0;
    let mut daily = Vec::with_capacity(DAYS_PER_ROW as usize);
    for day in 1..=DAYS_PER_ROW {
        let cell = raw
            .get(&day.to_string())
            .map(normalize_cell)
            .unwrap_or_default();
        if let Some(v) = cell.value() {
            achieved_sum += v;
        }
        daily.push(QmDailyCell::new(day, cell));
    }

    Some(QmRow {
        sheet: sheet_name.to_string(),
        project_name,
        agent_name,
        target_soll: numeric_value(raw.get(TARGET_HEADER)),
        perf_score: numeric_value(raw.get(PERF_HEADER)),
        attainment_provided: numeric_value(raw.get(ATTAINMENT_HEADER)),
        achieved_sum,
        notes: text_value(raw.get(NOTES_HEADER)),
        daily,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qm::models::CellValue;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn sample_row() -> RawRow {
        RawRow::from_iter([
            ("Projekt", s("Energie Nord")),
            ("Agent", s("M. Keller")),
            ("Soll", Data::Float(120.0)),
            ("Perf", s("1.15")),
            (" ", Data::Float(0.87)),
            ("Notizen", s("Urlaub ab 20.")),
            ("1", Data::Float(4.0)),
            ("2", s("U")),
            ("3", s("3.5")),
            ("17", Data::Int(6)),
        ])
    }

    #[test]
    fn test_normalize_row_extracts_named_fields() {
        let row = normalize_row(&sample_row(), "Abschlüsse 04.2024").unwrap();

        assert_eq!(row.sheet, "Abschlüsse 04.2024");
        assert_eq!(row.project_name, "Energie Nord");
        assert_eq!(row.agent_name, "M. Keller");
        assert_eq!(row.target_soll, Some(120.0));
        assert_eq!(row.perf_score, Some(1.15));
        assert_eq!(row.attainment_provided, Some(0.87));
        assert_eq!(row.notes.as_deref(), Some("Urlaub ab 20."));
    }

    #[test]
    fn test_normalize_row_builds_31_days_and_sum() {
        let row = normalize_row(&sample_row(), "S").unwrap();

        assert_eq!(row.daily.len(), 31);
        for (idx, cell) in row.daily.iter().enumerate() {
            assert_eq!(cell.day as usize, idx + 1);
        }
        assert_eq!(row.daily[0].cell, CellValue::Numeric(4.0));
        assert_eq!(row.daily[1].cell, CellValue::Coded("U".to_string()));
        assert_eq!(row.daily[2].cell, CellValue::Numeric(3.5));
        assert_eq!(row.daily[16].cell, CellValue::Numeric(6.0));
        assert!(row.daily[30].cell.is_empty());
        assert_eq!(row.achieved_sum, 13.5);
    }

    #[test]
    fn test_lowercase_headers_are_accepted() {
        let raw = RawRow::from_iter([
            ("projekt", s("P")),
            ("agent", s("A")),
            ("soll", s("50")),
            ("perf", Data::Float(0.5)),
            ("notizen", s("n")),
        ]);
        let row = normalize_row(&raw, "S").unwrap();

        assert_eq!(row.project_name, "P");
        assert_eq!(row.agent_name, "A");
        assert_eq!(row.target_soll, Some(50.0));
        assert_eq!(row.perf_score, Some(0.5));
        assert_eq!(row.notes.as_deref(), Some("n"));
    }

    #[test]
    fn test_row_without_project_and_agent_is_dropped() {
        let raw = RawRow::from_iter([("Projekt", s("  ")), ("1", Data::Float(3.0))]);
        assert!(normalize_row(&raw, "S").is_none());
        assert!(normalize_row(&RawRow::new(), "S").is_none());
    }

    #[test]
    fn test_row_with_only_one_identifier_is_kept() {
        let only_agent = RawRow::from_iter([("Agent", s("Solo"))]);
        let only_project = RawRow::from_iter([("Projekt", s("Solo-Projekt"))]);

        let agent_row = normalize_row(&only_agent, "S").unwrap();
        assert_eq!(agent_row.project_name, "");
        assert_eq!(agent_row.agent_name, "Solo");
        assert!(normalize_row(&only_project, "S").is_some());
    }

    #[test]
    fn test_unparseable_figures_are_null_not_zero() {
        let raw = RawRow::from_iter([
            ("Agent", s("A")),
            ("Soll", s("offen")),
            ("Perf", Data::Empty),
        ]);
        let row = normalize_row(&raw, "S").unwrap();

        assert_eq!(row.target_soll, None);
        assert_eq!(row.perf_score, None);
        assert_eq!(row.attainment_provided, None);
        assert_eq!(row.notes, None);
        assert_eq!(row.achieved_sum, 0.0);
    }

    #[test]
    fn test_zero_target_stays_zero() {
        let raw = RawRow::from_iter([("Agent", s("A")), ("Soll", Data::Float(0.0))]);
        assert_eq!(normalize_row(&raw, "S").unwrap().target_soll, Some(0.0));
    }

    #[test]
    fn test_attainment_requires_exact_space_header() {
        let raw = RawRow::from_iter([("Agent", s("A")), ("  ", Data::Float(0.9))]);
        assert_eq!(normalize_row(&raw, "S").unwrap().attainment_provided, None);
    }

    #[test]
    fn test_duplicate_header_keeps_first_column() {
        let raw = RawRow::from_iter([
            ("Agent", s("First")),
            ("AGENT", s("Second")),
        ]);
        assert_eq!(normalize_row(&raw, "S").unwrap().agent_name, "First");
    }

    #[test]
    fn test_sum_matches_daily_values() {
        let raw: RawRow = (1..=31u8)
            .map(|d| (d.to_string(), Data::Float(f64::from(d) * 0.5)))
            .chain([("Agent".to_string(), s("A"))])
            .collect();
        let row = normalize_row(&raw, "S").unwrap();

        let expected: f64 = row.daily.iter().filter_map(|c| c.value()).sum();
        assert_eq!(row.achieved_sum, expected);
        assert_eq!(row.achieved_sum, 248.0);
    }
}
