//! Health endpoint tests

use axum::http::StatusCode;

use crate::common::*;

#[tokio::test]
async fn test_liveness() {
    let app = TestApp::new();

    app.get("/health/live").await.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_detailed_health_reports_unconfigured_backend() {
    let app = TestApp::new();

    let response = app.get("/health/detailed").await;
    response.assert_ok();

    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["components"]["backend"]["status"], "not_configured");
    assert_eq!(json["components"]["model_catalog"]["status"], "configured");
    assert_eq!(
        json["components"]["model_catalog"]["message"],
        "http://127.0.0.1:9"
    );
}

#[tokio::test]
async fn test_health_routes_carry_no_function_cors_headers() {
    let app = TestApp::new();

    let response = app.get("/health").await;

    response.assert_ok();
    assert!(response.header("access-control-allow-origin").is_none());
}
