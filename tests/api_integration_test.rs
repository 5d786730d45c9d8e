// API integration tests that verify HTTP endpoints
// Tests the Axum router with in-process requests; remote sources are served by mockito

use std::io::Write;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt; // For `.collect()`
use mockito::Server;
use qm_ingest_service::api::{create_router, AppState};
use qm_ingest_service::fetcher::SourceFetcher;
use qm_ingest_service::outcomes::{CampaignCategories, CategoryCache, CategoryMap};
use qm_ingest_service::services::IngestService;
use serde_json::{json, Value};
use tower::ServiceExt; // For `oneshot`

const SAMPLE_WORKBOOK: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/qm_sample.xlsx");

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn test_categories() -> CategoryMap {
    let mut map = CategoryMap::new();
    map.insert(
        "energie",
        CampaignCategories {
            open: labels(&["wiedervorlage"]),
            success: labels(&["abschluss", "termin_vereinbart"]),
            declined: labels(&["kein_interesse"]),
        },
    );
    map.insert(
        "glasfaser",
        CampaignCategories {
            open: labels(&[]),
            success: labels(&["vertrag"]),
            declined: labels(&["abschluss"]),
        },
    );
    map
}

fn create_test_app(cache: CategoryCache) -> Router {
    let state = AppState {
        ingest_service: IngestService::new(SourceFetcher::new(), None),
        category_cache: cache,
    };
    create_router(state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(CategoryCache::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_classify_known_labels() {
    let app = create_test_app(CategoryCache::with_categories(test_categories()));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/outcomes/classify",
            json!({ "label": "Termin Vereinbart" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["label"], "Termin Vereinbart");
    assert_eq!(json["normalized"], "termin_vereinbart");
    assert_eq!(json["outcome"], "positive");
    assert_eq!(json["categoriesVersion"], 1);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/outcomes/classify",
            json!({ "label": "kein_interesse" }),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["outcome"], "negative");
}

#[tokio::test]
async fn test_classify_first_campaign_wins_unless_scoped() {
    let app = create_test_app(CategoryCache::with_categories(test_categories()));

    // "abschluss" is a success for energie and a decline for glasfaser
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/outcomes/classify",
            json!({ "label": "abschluss" }),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["outcome"], "positive");

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/outcomes/classify",
            json!({ "label": "abschluss", "campaignId": "glasfaser" }),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["outcome"], "negative");
}

#[tokio::test]
async fn test_classify_without_categories_is_offen() {
    let app = create_test_app(CategoryCache::new());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/outcomes/classify",
            json!({ "label": "abschluss" }),
        ))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["outcome"], "offen");
    assert_eq!(json["categoriesVersion"], 0);
}

#[tokio::test]
async fn test_categories_endpoint_returns_snapshot() {
    let app = create_test_app(CategoryCache::with_categories(test_categories()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/outcomes/categories")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["version"], 1);
    assert!(json["fetchedAt"].is_string());
    assert_eq!(json["campaigns"][0]["campaignId"], "energie");
    assert_eq!(json["campaigns"][1]["campaignId"], "glasfaser");
    assert_eq!(json["campaigns"][1]["categories"]["success"][0], "vertrag");
}

#[tokio::test]
async fn test_import_missing_local_source_is_404() {
    let app = create_test_app(CategoryCache::new());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/qm/import",
            json!({ "source": "/nonexistent/qm.xlsx" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("/nonexistent/qm.xlsx"));
}

#[tokio::test]
async fn test_import_empty_source_is_400() {
    let app = create_test_app(CategoryCache::new());

    let response = app
        .oneshot(json_request("POST", "/api/v1/qm/import", json!({ "source": "  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_corrupt_workbook_is_422() {
    let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    file.write_all(b"not a workbook").unwrap();

    let app = create_test_app(CategoryCache::new());
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/qm/import",
            json!({ "source": file.path().to_str().unwrap() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_sheets_upstream_error_is_502() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/qm.xlsx")
        .with_status(404)
        .create_async()
        .await;

    let app = create_test_app(CategoryCache::new());
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/qm/sheets",
            json!({ "source": format!("{}/qm.xlsx", server.url()) }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("404"));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_import_forwards_request_cookie() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/gated/qm.xlsx")
        .match_header("cookie", "session=xyz")
        .with_status(200)
        .with_body(b"not a workbook")
        .create_async()
        .await;

    let app = create_test_app(CategoryCache::new());
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/qm/import",
            json!({
                "source": format!("{}/gated/qm.xlsx", server.url()),
                "cookie": "session=xyz",
            }),
        ))
        .await
        .unwrap();

    // The download succeeded with the cookie; the bytes are not a workbook
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_import_downloads_workbook_behind_redirect() {
    let workbook = std::fs::read(SAMPLE_WORKBOOK).unwrap();
    let mut server = Server::new_async().await;

    let redirect = server
        .mock("GET", "/share/qm")
        .match_header("cookie", "session=xyz")
        .with_status(302)
        .with_header("location", "/files/qm_2024.xlsx")
        .create_async()
        .await;
    let download = server
        .mock("GET", "/files/qm_2024.xlsx")
        .match_header("cookie", "session=xyz")
        .with_status(200)
        .with_body(workbook)
        .create_async()
        .await;

    let app = create_test_app(CategoryCache::new());
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/qm/import",
            json!({
                "source": format!("{}/share/qm", server.url()),
                "month": "2024-04",
                "cookie": "session=xyz",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["sheet"], "Abschlüsse 04.2024");
    assert_eq!(json["rowCount"], 2);
    assert_eq!(json["rows"][0]["agentName"], "M. Keller");
    assert_eq!(json["rows"][0]["achievedSum"], 13.5);
    assert_eq!(json["rows"][0]["daily"][4], json!({ "day": 5, "code": "" }));
    assert_eq!(json["rows"][1]["achievedSum"], 7.0);

    redirect.assert_async().await;
    download.assert_async().await;
}

#[tokio::test]
async fn test_sheets_lists_local_workbook() {
    let app = create_test_app(CategoryCache::new());
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/qm/sheets",
            json!({ "source": SAMPLE_WORKBOOK }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["sheets"],
        json!(["Jan 2024", "Abschlüsse 03.2024", "Abschlüsse 04.2024"])
    );
    assert_eq!(json["selected"], "Abschlüsse 03.2024");
}
