//! Health check endpoints
//!
//! Provides health check endpoints for monitoring and load balancers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Basic health response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health response with upstream configuration
#[derive(Serialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub version: String,
    pub components: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub backend: ComponentStatus,
    pub model_catalog: ComponentStatus,
}

/// Status of a single component
#[derive(Serialize)]
pub struct ComponentStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentStatus {
    fn configured(message: impl Into<String>) -> Self {
        Self {
            status: "configured".to_string(),
            message: Some(message.into()),
        }
    }

    fn not_configured() -> Self {
        Self {
            status: "not_configured".to_string(),
            message: None,
        }
    }
}

/// Simple health check endpoint (for load balancers)
///
/// Returns 200 OK if the service is running.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Reports which upstreams are configured. Never contacts them.
pub async fn health_check_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let backend = match state.config.backend {
        Some(ref backend) => ComponentStatus::configured(backend.url.clone()),
        None => ComponentStatus::not_configured(),
    };

    Json(DetailedHealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components: ComponentHealth {
            backend,
            model_catalog: ComponentStatus::configured(state.config.openai.base_url.clone()),
        },
    })
}

/// Liveness probe (for Kubernetes)
///
/// Returns 200 OK if the process is alive.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
