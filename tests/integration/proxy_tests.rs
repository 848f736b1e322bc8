//! Edge function tests

use axum::http::StatusCode;
use rstest::rstest;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::*;

const ENDPOINT: &str = "/functions/v1/check-openai-models";

async fn upstream(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_preflight_returns_empty_ok() {
    let app = TestApp::new();

    let response = app.options(ENDPOINT).await;

    response.assert_ok().assert_cors();
    assert!(response.body.is_empty());
}

#[rstest]
#[case(json!({}))]
#[case(json!({ "apiKey": "" }))]
#[case(json!({ "apiKey": null }))]
#[tokio::test]
async fn test_missing_key_is_rejected(#[case] body: serde_json::Value) {
    let app = TestApp::new();

    let response = app.post_json(ENDPOINT, body).await;

    response.assert_bad_request().assert_cors();
    assert_eq!(
        response.json::<serde_json::Value>(),
        json!({ "error": "API key is required" })
    );
}

#[tokio::test]
async fn test_upstream_unauthorized_maps_to_invalid_key() {
    let server = upstream(401, json!({ "error": { "message": "Incorrect API key" } })).await;
    let app = TestApp::with_upstream(&server.uri());

    let response = app.post_json(ENDPOINT, json!({ "apiKey": "sk-wrong" })).await;

    response.assert_unauthorized().assert_cors();
    assert_eq!(
        response.json::<serde_json::Value>(),
        json!({ "error": "Invalid API key" })
    );
}

#[rstest]
#[case(403)]
#[case(429)]
#[case(503)]
#[tokio::test]
async fn test_upstream_failure_status_is_forwarded(#[case] status: u16) {
    let server = upstream(status, json!({})).await;
    let app = TestApp::with_upstream(&server.uri());

    let response = app.post_json(ENDPOINT, json!({ "apiKey": "sk-test" })).await;

    response
        .assert_status(StatusCode::from_u16(status).unwrap())
        .assert_cors();
    assert_eq!(
        response.json::<serde_json::Value>(),
        json!({ "error": "Failed to fetch models from OpenAI" })
    );
}

#[tokio::test]
async fn test_chat_models_filtered_and_sorted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("authorization", "Bearer sk-valid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream_models()))
        .expect(1)
        .mount(&server)
        .await;
    let app = TestApp::with_upstream(&server.uri());

    let response = app.post_json(ENDPOINT, json!({ "apiKey": "sk-valid" })).await;

    response.assert_ok().assert_cors();
    assert_eq!(
        response.json::<serde_json::Value>(),
        json!({
            "models": [
                { "id": "gpt-4o", "created": 200 },
                { "id": "gpt-4", "created": 100 }
            ]
        })
    );
}

#[tokio::test]
async fn test_malformed_request_body_is_internal_error() {
    let app = TestApp::new();

    let response = app.post_raw(ENDPOINT, "{not json").await;

    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_cors();
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().is_some_and(|message| !message.is_empty()));
}

#[tokio::test]
async fn test_unreachable_upstream_is_internal_error() {
    let app = TestApp::new();

    let response = app.post_json(ENDPOINT, json!({ "apiKey": "sk-test" })).await;

    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_cors();
}

#[tokio::test]
async fn test_upstream_body_without_models_is_internal_error() {
    let server = upstream(200, json!({ "object": "list" })).await;
    let app = TestApp::with_upstream(&server.uri());

    let response = app.post_json(ENDPOINT, json!({ "apiKey": "sk-test" })).await;

    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_cors();
    let body: serde_json::Value = response.json();
    assert!(body.get("models").is_none());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();

    let response = app.get("/functions/v1/does-not-exist").await;

    response.assert_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "not_found");
}
