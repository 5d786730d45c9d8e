use serde::{Deserialize, Serialize};

/// Number of day columns every QM sheet carries, independent of the month's length.
pub const DAYS_PER_ROW: u8 = 31;

/// Normalized content of a single spreadsheet cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Numeric(f64),
    /// Non-numeric status token such as an absence code ("U", "K", "#N/A")
    Coded(String),
}

impl CellValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            CellValue::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            CellValue::Coded(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// One calendar day's figure within a [`QmRow`]
///
/// Serializes as `{"day": 3}`, `{"day": 3, "value": 7.5}` or `{"day": 3, "code": "U"}`;
/// `value` and `code` are never both present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DailyCellRepr", into = "DailyCellRepr")]
pub struct QmDailyCell {
    pub day: u8,
    pub cell: CellValue,
}

impl QmDailyCell {
    pub fn new(day: u8, cell: CellValue) -> Self {
        Self { day, cell }
    }

    pub fn value(&self) -> Option<f64> {
        self.cell.value()
    }

    pub fn code(&self) -> Option<&str> {
        self.cell.code()
    }
}

// Wire shape of a daily cell
#[derive(Serialize, Deserialize)]
struct DailyCellRepr {
    day: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl From<QmDailyCell> for DailyCellRepr {
    fn from(cell: QmDailyCell) -> Self {
        let (value, code) = match cell.cell {
            CellValue::Empty => (None, None),
            CellValue::Numeric(v) => (Some(v), None),
            CellValue::Coded(c) => (None, Some(c)),
        };
        Self {
            day: cell.day,
            value,
            code,
        }
    }
}

impl From<DailyCellRepr> for QmDailyCell {
    fn from(repr: DailyCellRepr) -> Self {
        // A numeric value takes precedence if a producer ever sent both
        let cell = match (repr.value, repr.code) {
            (Some(v), _) => CellValue::Numeric(v),
            (None, Some(c)) => CellValue::Coded(c),
            (None, None) => CellValue::Empty,
        };
        Self { day: repr.day, cell }
    }
}

/// Canonical record for one agent within one project for one reporting period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QmRow {
    pub sheet: String,
    pub project_name: String,
    pub agent_name: String,
    pub target_soll: Option<f64>,
    pub perf_score: Option<f64>,
    /// Attainment percentage taken verbatim from the column headed by a single space
    pub attainment_provided: Option<f64>,
    pub achieved_sum: f64,
    pub notes: Option<String>,
    pub daily: Vec<QmDailyCell>,
}

impl QmRow {
    /// Daily cell for `day` (1-based)
    pub fn day(&self, day: u8) -> Option<&QmDailyCell> {
        self.daily.iter().find(|c| c.day == day)
    }

    /// Days that carry a status code instead of a number
    pub fn coded_days(&self) -> impl Iterator<Item = (u8, &str)> {
        self.daily
            .iter()
            .filter_map(|c| c.code().map(|code| (c.day, code)))
    }
}
