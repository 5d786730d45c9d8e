use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::fetch_error::FetchError;
use crate::outcomes::{normalize_label, CategoryCache, CategorySnapshot, Outcome};
use crate::qm::ImportError;
use crate::services::{IngestError, IngestRequest, IngestResult, IngestService, SheetListing};

#[derive(Clone)]
pub struct AppState {
    pub ingest_service: IngestService,
    pub category_cache: CategoryCache,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    pub label: String,
    pub campaign_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    pub label: String,
    pub normalized: String,
    pub outcome: Outcome,
    pub categories_version: u64,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Error response carrying a status code and a JSON `{ "error": ... }` body
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        let status = match &err {
            IngestError::Fetch(FetchError::NotFound(_)) => StatusCode::NOT_FOUND,
            IngestError::Fetch(FetchError::InvalidHeader(_)) => StatusCode::BAD_REQUEST,
            IngestError::Fetch(FetchError::Network { .. })
            | IngestError::Fetch(FetchError::TooManyRedirects { .. }) => StatusCode::BAD_GATEWAY,
            IngestError::Import(ImportError::Sheet(_))
            | IngestError::Import(ImportError::WorkbookOpen(_))
            | IngestError::Import(ImportError::SheetRead { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::Fetch(FetchError::Io(_)) | IngestError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/qm/import", post(import_qm))
        .route("/qm/sheets", post(list_sheets))
        .route("/outcomes/classify", post(classify_outcome))
        .route("/outcomes/categories", get(get_categories))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[instrument(skip(state, request), fields(source = %request.source))]
async fn import_qm(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResult>, ApiError> {
    if request.source.trim().is_empty() {
        warn!("Import requested without source");
        return Err(ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "source must not be empty".to_string(),
        });
    }

    let result = state.ingest_service.ingest(&request).await.map_err(|e| {
        error!("Failed to ingest {}: {}", request.source, e);
        ApiError::from(e)
    })?;

    info!(
        "Imported {} rows from sheet {} of {}",
        result.row_count, result.sheet, request.source
    );
    Ok(Json(result))
}

#[instrument(skip(state, request), fields(source = %request.source))]
async fn list_sheets(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<SheetListing>, ApiError> {
    let listing = state.ingest_service.list_sheets(&request).await.map_err(|e| {
        error!("Failed to list sheets of {}: {}", request.source, e);
        ApiError::from(e)
    })?;

    debug!("Sheets of {}: {:?}", request.source, listing.sheets);
    Ok(Json(listing))
}

#[instrument(skip(state))]
async fn classify_outcome(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Json<ClassifyResponse> {
    let snapshot = state.category_cache.snapshot();
    let outcome = snapshot.classify(&request.label, request.campaign_id.as_deref());

    debug!("Classified '{}' as {}", request.label, outcome);
    Json(ClassifyResponse {
        normalized: normalize_label(&request.label),
        label: request.label,
        outcome,
        categories_version: snapshot.version,
    })
}

#[instrument(skip(state))]
async fn get_categories(State(state): State<AppState>) -> Json<CategorySnapshot> {
    let snapshot = state.category_cache.snapshot();
    debug!(
        "Serving category snapshot version {} ({} campaigns)",
        snapshot.version,
        snapshot.campaigns.len()
    );
    Json(CategorySnapshot::clone(&snapshot))
}
