/// Sheet Selector
///
/// Picks the worksheet to import from a workbook's sheet list. Resolution order:
/// 1. explicit sheet name (exact match)
/// 2. month hint: `"Abschlüsse MM.YYYY"`, exact name first, then substring
/// 3. first sheet following the "Abschlüsse" naming convention
/// 4. last sheet (workbooks are kept chronologically, latest last)
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SheetError {
    #[error("Workbook contains no worksheets")]
    NoSheet,
}

/// Optional caller intent for sheet selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetHint {
    pub explicit_sheet: Option<String>,
    /// Reporting month as `YYYY-MM` (`YYYY-M` is accepted and zero-padded)
    pub month: Option<String>,
}

impl SheetHint {
    pub fn sheet(name: impl Into<String>) -> Self {
        Self {
            explicit_sheet: Some(name.into()),
            month: None,
        }
    }

    pub fn month(month: impl Into<String>) -> Self {
        Self {
            explicit_sheet: None,
            month: Some(month.into()),
        }
    }
}

fn closing_sheet_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)absch|abschluss|abschlüsse").expect("closing sheet pattern is valid")
    })
}

/// Select the sheet to import
pub fn select_sheet<S: AsRef<str>>(sheet_names: &[S], hint: &SheetHint) -> Result<String, SheetError> {
    let last = sheet_names.last().ok_or(SheetError::NoSheet)?;
    let names = || sheet_names.iter().map(|s| s.as_ref());

    if let Some(explicit) = hint.explicit_sheet.as_deref() {
        if let Some(name) = names().find(|n| *n == explicit) {
            debug!("Selected explicitly requested sheet '{}'", name);
            return Ok(name.to_string());
        }
        warn!("Requested sheet '{}' not found, falling back to heuristics", explicit);
    }

    if let Some(month) = hint.month.as_deref() {
        match month_sheet_name(month) {
            Some(pattern) => {
                let found = names()
                    .find(|n| *n == pattern)
                    .or_else(|| names().find(|n| n.contains(&pattern)));
                if let Some(name) = found {
                    debug!("Selected sheet '{}' for month {}", name, month);
                    return Ok(name.to_string());
                }
                debug!("No sheet matches '{}', falling back to heuristics", pattern);
            }
            None => warn!("Ignoring malformed month hint '{}' (expected YYYY-MM)", month),
        }
    }

    if let Some(name) = names().find(|n| closing_sheet_pattern().is_match(n)) {
        debug!("Selected first closing sheet '{}'", name);
        return Ok(name.to_string());
    }

    debug!("No closing sheet found, using last sheet '{}'", last.as_ref());
    Ok(last.as_ref().to_string())
}

/// Sheet name for a `YYYY-MM` month hint, e.g. `2024-04` → `Abschlüsse 04.2024`
///
/// Single-digit months are zero-padded; anything that is not a year and a month 1-12 yields `None`.
pub fn month_sheet_name(month: &str) -> Option<String> {
    let (year, month) = month.trim().split_once('-')?;
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if month.is_empty() || month.len() > 2 || !month.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let month: u32 = month.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(format!("Abschlüsse {month:02}.{year}"))
}
