use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::fetch_error::FetchError;
use crate::fetcher::{FetchedSource, SourceFetcher};
use crate::qm::{ImportError, QmImporter, QmRow, QmSheet, SheetHint};

/// Error types for ingestion runs
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Import task failed: {0}")]
    Task(String),
}

/// What to ingest and how to pick the sheet
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub source: String,
    pub sheet: Option<String>,
    /// Reporting month, `YYYY-MM`
    pub month: Option<String>,
    /// Cookie for gated document stores; falls back to the service default
    pub cookie: Option<String>,
}

impl IngestRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn hint(&self) -> SheetHint {
        SheetHint {
            explicit_sheet: self.sheet.clone().filter(|s| !s.is_empty()),
            month: self.month.clone().filter(|m| !m.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResult {
    pub sheet: String,
    pub row_count: usize,
    pub duration_secs: f64,
    pub rows: Vec<QmRow>,
}

/// Sheet listing of a workbook plus the sheet the selector would pick
#[derive(Debug, Clone, Serialize)]
pub struct SheetListing {
    pub sheets: Vec<String>,
    pub selected: String,
}

/// Fetch → select → normalize
///
/// Each run downloads into its own temp file, which is removed once the rows are parsed.
#[derive(Clone)]
pub struct IngestService {
    fetcher: SourceFetcher,
    default_cookie: Option<String>,
}

impl IngestService {
    pub fn new(fetcher: SourceFetcher, default_cookie: Option<String>) -> Self {
        Self {
            fetcher,
            default_cookie,
        }
    }

    #[instrument(skip(self, request), fields(source = %request.source))]
    pub async fn ingest(&self, request: &IngestRequest) -> Result<IngestResult, IngestError> {
        let start_time = Instant::now();
        info!("Starting QM ingestion from {}", request.source);

        let fetched = self.fetch(request).await?;
        let hint = request.hint();
        let QmSheet { sheet, rows } =
            run_blocking(fetched, move |importer| importer.import(&hint)).await?;

        if rows.is_empty() {
            warn!("Sheet {} yielded no rows", sheet);
        }

        let duration = start_time.elapsed();
        info!(
            "✓ QM ingestion complete: {} rows from sheet {} ({:.1}s)",
            rows.len(),
            sheet,
            duration.as_secs_f64()
        );

        Ok(IngestResult {
            sheet,
            row_count: rows.len(),
            duration_secs: duration.as_secs_f64(),
            rows,
        })
    }

    /// List the workbook's sheets and report which one a run with `request` would import
    #[instrument(skip(self, request), fields(source = %request.source))]
    pub async fn list_sheets(&self, request: &IngestRequest) -> Result<SheetListing, IngestError> {
        let fetched = self.fetch(request).await?;
        let hint = request.hint();
        run_blocking(fetched, move |importer| {
            let sheets = importer.sheet_names()?;
            let selected = crate::qm::select_sheet(&sheets, &hint)?;
            Ok(SheetListing { sheets, selected })
        })
        .await
    }

    async fn fetch(&self, request: &IngestRequest) -> Result<FetchedSource, IngestError> {
        let cookie = request
            .cookie
            .as_deref()
            .or(self.default_cookie.as_deref());
        Ok(self.fetcher.fetch_with_cookie(&request.source, cookie).await?)
    }
}

/// Run workbook parsing off the async runtime; the fetched file lives until parsing finishes
async fn run_blocking<T, F>(fetched: FetchedSource, work: F) -> Result<T, IngestError>
where
    T: Send + 'static,
    F: FnOnce(&QmImporter) -> Result<T, ImportError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let importer = QmImporter::new(fetched.path());
        let result = work(&importer);
        drop(fetched);
        result
    })
    .await
    .map_err(|e| IngestError::Task(e.to_string()))?
    .map_err(IngestError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_hint_ignores_empty_strings() {
        let request = IngestRequest {
            source: "qm.xlsx".to_string(),
            sheet: Some(String::new()),
            month: Some("2024-04".to_string()),
            cookie: None,
        };

        let hint = request.hint();
        assert_eq!(hint.explicit_sheet, None);
        assert_eq!(hint.month.as_deref(), Some("2024-04"));
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: IngestRequest =
            serde_json::from_str(r#"{"source": "https://x/qm.xlsx", "month": "2024-04"}"#).unwrap();
        assert_eq!(request.source, "https://x/qm.xlsx");
        assert_eq!(request.sheet, None);
        assert_eq!(request.month.as_deref(), Some("2024-04"));
    }

    #[tokio::test]
    async fn test_missing_local_source_is_not_found() {
        let service = IngestService::new(SourceFetcher::new(), None);
        let result = service
            .ingest(&IngestRequest::new("/nonexistent/qm.xlsx"))
            .await;

        assert!(matches!(
            result,
            Err(IngestError::Fetch(FetchError::NotFound(_)))
        ));
    }
}
