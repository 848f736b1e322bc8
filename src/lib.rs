//! Endpoint Admin Library
//!
//! Data synchronization layer of the endpoint security dashboard plus the
//! edge functions it calls.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod hooks;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
use services::model_proxy::ModelCatalogClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Upstream model catalog used by `check-openai-models`
    pub models: Arc<ModelCatalogClient>,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let models = Arc::new(ModelCatalogClient::new(&config.openai)?);
        Ok(Self { config, models })
    }
}
