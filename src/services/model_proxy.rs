//! Model catalog proxy
//!
//! Backs the `check-openai-models` function: lists the models visible to a
//! caller-supplied API key and keeps only general-purpose chat models.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OpenAiConfig;
use crate::utils::ProxyError;

/// Model ids containing any of these are not chat completions models
const EXCLUDED_MARKERS: [&str; 4] = ["instruct", "vision", "realtime", "audio"];

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamModel {
    pub id: String,
    #[serde(default)]
    pub created: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpstreamModelList {
    pub data: Vec<UpstreamModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub id: String,
    pub created: i64,
}

/// Keep chat models, newest first
pub fn select_chat_models(models: Vec<UpstreamModel>) -> Vec<ModelSummary> {
    let mut selected: Vec<ModelSummary> = models
        .into_iter()
        .filter(|model| {
            model.id.contains("gpt")
                && !EXCLUDED_MARKERS
                    .iter()
                    .any(|marker| model.id.contains(marker))
        })
        .map(|model| ModelSummary {
            id: model.id,
            created: model.created,
        })
        .collect();
    selected.sort_by(|a, b| b.created.cmp(&a.created));
    selected
}

pub struct ModelCatalogClient {
    client: Client,
    base_url: String,
}

impl ModelCatalogClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build model catalog HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the caller's model list and filter it to chat models
    pub async fn list_models(&self, api_key: &str) -> Result<Vec<ModelSummary>, ProxyError> {
        let url = format!("{}/v1/models", self.base_url);
        debug!("Listing models from {}", url);

        let response = self.client.get(&url).bearer_auth(api_key).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ProxyError::InvalidApiKey);
        }
        if !status.is_success() {
            warn!(status = %status, "Model listing upstream returned an error");
            return Err(ProxyError::Upstream(status));
        }

        let body = response.text().await?;
        let list: UpstreamModelList = serde_json::from_str(&body)?;
        Ok(select_chat_models(list.data))
    }
}
