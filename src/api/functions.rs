//! Edge functions
//!
//! `check-openai-models` validates a caller-supplied OpenAI key by listing the
//! chat models it can use.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::services::ModelSummary;
use crate::utils::ProxyError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/check-openai-models",
        post(check_openai_models).options(preflight),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckModelsRequest {
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckModelsResponse {
    pub models: Vec<ModelSummary>,
}

/// CORS preflight: empty 200, headers added by the router layer
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn check_openai_models(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CheckModelsResponse>, ProxyError> {
    let request: CheckModelsRequest = serde_json::from_slice(&body)?;
    let api_key = request
        .api_key
        .filter(|key| !key.is_empty())
        .ok_or(ProxyError::MissingApiKey)?;

    let models = state.models.list_models(&api_key).await?;
    debug!(count = models.len(), "Listed chat models");

    Ok(Json(CheckModelsResponse { models }))
}
