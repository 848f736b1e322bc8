//! Test application setup utilities
//!
//! Provides utilities for driving the HTTP router in-process, with the model
//! catalog pointed at a local upstream.

use axum::{body::Body, http::Request, Router};
use tower::ServiceExt;

use endpoint_admin::{
    api,
    config::{AppConfig, OpenAiConfig},
    AppState,
};

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application with the default configuration
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a test application whose model catalog calls `base_url`
    pub fn with_upstream(base_url: &str) -> Self {
        let mut config = test_config();
        config.openai.base_url = base_url.to_string();
        Self::with_config(config)
    }

    /// Create a new test application with custom configuration
    pub fn with_config(config: AppConfig) -> Self {
        let state = AppState::new(config).expect("Failed to build application state");
        let router = api::routes().with_state(state.clone());
        Self { router, state }
    }

    /// Make a GET request to the test application
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.post_raw(uri, body.to_string()).await
    }

    /// Make a POST request with an arbitrary body
    pub async fn post_raw(&self, uri: &str, body: impl Into<String>) -> TestResponse {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.into()))
                .unwrap(),
        )
        .await
    }

    /// Make an OPTIONS (preflight) request
    pub async fn options(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("OPTIONS")
                .uri(uri)
                .header("Origin", "https://dashboard.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// Assert the response status is OK (200)
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    /// Assert the response status is Bad Request (400)
    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::BAD_REQUEST)
    }

    /// Assert the response status is Unauthorized (401)
    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::UNAUTHORIZED)
    }

    /// Assert the response status is Not Found (404)
    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }

    /// Assert the permissive CORS headers of edge functions are present
    pub fn assert_cors(&self) -> &Self {
        assert_eq!(self.header("access-control-allow-origin"), Some("*"));
        assert_eq!(
            self.header("access-control-allow-headers"),
            Some(api::FUNCTION_ALLOW_HEADERS)
        );
        self
    }
}

/// Configuration pointing every upstream at an unroutable local port
pub fn test_config() -> AppConfig {
    AppConfig {
        openai: OpenAiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 5,
        },
        ..AppConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = TestApp::new();
        let response = app.get("/health").await;
        response.assert_ok();
        let json: serde_json::Value = response.json();
        assert!(json.get("status").is_some());
    }
}
