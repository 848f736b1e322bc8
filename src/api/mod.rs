//! API routes and handlers
//!
//! This module defines all HTTP endpoints and their routing.

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::utils::AppError;
use crate::AppState;

mod functions;
mod health;

pub use functions::CheckModelsResponse;
pub use health::*;

/// Headers browsers may send to edge functions
pub const FUNCTION_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Health endpoints
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/detailed", get(health::health_check_detailed))
        .route("/health/live", get(health::liveness))
}

/// Edge functions; every response carries permissive CORS headers
pub fn function_routes() -> Router<AppState> {
    functions::routes()
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(FUNCTION_ALLOW_HEADERS),
        ))
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// Create the full router (useful for tests)
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .nest("/functions/v1", function_routes())
        .fallback(not_found)
}
