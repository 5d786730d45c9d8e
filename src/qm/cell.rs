/// Cell Normalizer
///
/// Turns a raw worksheet cell into a [`CellValue`]. Both entry points are total: every input maps
/// to `Empty`, `Numeric` or `Coded`, so malformed data never aborts an import.
///
/// Text is parsed with Rust's `f64` grammar applied to the whole trimmed string (optional sign,
/// decimal point, exponent). There is no prefix parsing: `"7h"` or `"7,5"` stay coded and do not
/// contribute to row sums. `"NaN"` and `"inf"` parse but are not finite, so they stay coded too.
use calamine::Data;

use crate::qm::models::CellValue;

/// Normalize a calamine cell
pub fn normalize_cell(raw: &Data) -> CellValue {
    match raw {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Numeric(*i as f64),
        Data::Float(f) => numeric_or_coded(*f, || f.to_string()),
        // Excel dates are serial numbers on the wire; keep them numeric like any other number
        Data::DateTime(dt) => numeric_or_coded(dt.as_f64(), || dt.as_f64().to_string()),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => normalize_text(s),
        Data::Bool(b) => CellValue::Coded(b.to_string()),
        Data::Error(e) => CellValue::Coded(e.to_string()),
    }
}

/// Normalize a cell that arrived as text
///
/// Only the empty string is blank. Whitespace-only text is a (blank) code, `Coded("")`.
pub fn normalize_text(raw: &str) -> CellValue {
    if raw.is_empty() {
        return CellValue::Empty;
    }

    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => CellValue::Numeric(v),
        _ => CellValue::Coded(trimmed.to_string()),
    }
}

/// Numeric value of a cell, `None` for blanks and codes
///
/// Used for the optional figures of a row, where "unknown" must stay distinct from zero.
pub fn numeric_value(raw: Option<&Data>) -> Option<f64> {
    raw.map(normalize_cell).and_then(|c| c.value())
}

/// Trimmed text content of a cell, `None` when blank
pub fn text_value(raw: Option<&Data>) -> Option<String> {
    let text = match raw? {
        Data::Empty => return None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{f:.0}"),
        other => other.to_string().trim().to_string(),
    };

    (!text.is_empty()).then_some(text)
}

fn numeric_or_coded(v: f64, code: impl FnOnce() -> String) -> CellValue {
    if v.is_finite() {
        CellValue::Numeric(v)
    } else {
        CellValue::Coded(code())
    }
}
