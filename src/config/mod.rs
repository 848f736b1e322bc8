//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//! - Staleness and refetch policy of the query cache

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Hosted data store (REST + RPC surface)
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    /// Upstream used by the model listing edge function
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub tenant: TenantConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    54321
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: None,
        }
    }
}

/// Hosted backend connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.example.co`
    pub url: String,
    /// Public (anonymous) API key sent with every request
    pub anon_key: String,
    /// Session token of the signed-in user; falls back to the anon key
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

/// Model listing upstream
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix (default: "endpoint-admin")
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation (default: true for production)
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation - recommended for production
    File,
    /// Log to both console and file
    Both,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/endpoint-admin")
}

fn default_log_prefix() -> String {
    "endpoint-admin".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

/// Query cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Seconds before cached data is considered stale (0 = stale immediately)
    #[serde(default)]
    pub default_stale_secs: u64,
    /// Staleness of the near-real-time event log view
    #[serde(default = "default_event_log_stale")]
    pub event_log_stale_secs: u64,
    /// Automatic refresh period of the event log view (0 to disable)
    #[serde(default = "default_event_log_refetch")]
    pub event_log_refetch_secs: u64,
    /// Re-validate stale queries when the view regains focus
    #[serde(default = "default_refetch_on_focus")]
    pub refetch_on_focus: bool,
    /// Maximum number of cached query results
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_event_log_stale() -> u64 {
    10
}

fn default_event_log_refetch() -> u64 {
    30
}

fn default_refetch_on_focus() -> bool {
    true
}

fn default_max_entries() -> usize {
    500
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_stale_secs: 0,
            event_log_stale_secs: default_event_log_stale(),
            event_log_refetch_secs: default_event_log_refetch(),
            refetch_on_focus: default_refetch_on_focus(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheConfig {
    pub fn default_stale_time(&self) -> Duration {
        Duration::from_secs(self.default_stale_secs)
    }

    pub fn event_log_stale_time(&self) -> Duration {
        Duration::from_secs(self.event_log_stale_secs)
    }

    pub fn event_log_refetch_interval(&self) -> Option<Duration> {
        (self.event_log_refetch_secs > 0).then(|| Duration::from_secs(self.event_log_refetch_secs))
    }
}

/// Initial tenant selection
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TenantConfig {
    /// Persisted organization preference; the first available organization is used otherwise
    #[serde(default)]
    pub default_organization_id: Option<Uuid>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            backend: None,
            openai: OpenAiConfig::default(),
            logging: LoggingConfig::default(),
            cache: CacheConfig::default(),
            tenant: TenantConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("ENDPOINT_ADMIN_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                Self::from_file(path)?
            }
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}, using defaults", path);
                AppConfig::default()
            }
            None => {
                eprintln!("[CONFIG] No config file found, using defaults");
                AppConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            // Current directory
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            // System config directory
            PathBuf::from("/etc/endpoint-admin/config.yaml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("endpoint-admin/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(host) = std::env::var("ENDPOINT_ADMIN_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("ENDPOINT_ADMIN_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Backend overrides
        if let Ok(url) = std::env::var("BACKEND_URL") {
            let backend = self.backend.get_or_insert_with(|| BackendConfig {
                url: url.clone(),
                anon_key: String::new(),
                access_token: None,
                timeout_secs: default_timeout(),
            });
            backend.url = url;
        }
        if let Ok(key) = std::env::var("BACKEND_ANON_KEY") {
            if let Some(ref mut backend) = self.backend {
                backend.anon_key = key;
            }
        }

        // Upstream overrides
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            self.openai.base_url = url;
        }

        // Logging overrides
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("ENDPOINT_ADMIN_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }

        // Tenant overrides
        if let Ok(org) = std::env::var("DEFAULT_ORGANIZATION_ID") {
            match Uuid::parse_str(&org) {
                Ok(id) => self.tenant.default_organization_id = Some(id),
                Err(_) => eprintln!("[CONFIG] Ignoring invalid DEFAULT_ORGANIZATION_ID: {}", org),
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if let Some(ref backend) = self.backend {
            if backend.url.is_empty() {
                anyhow::bail!("Backend URL cannot be empty");
            }
            if backend.timeout_secs == 0 {
                anyhow::bail!("Backend timeout must be greater than 0");
            }
        }

        if self.openai.base_url.is_empty() {
            anyhow::bail!("OpenAI base URL cannot be empty");
        }
        if self.openai.timeout_secs == 0 {
            anyhow::bail!("OpenAI timeout must be greater than 0");
        }

        if self.cache.max_entries == 0 {
            anyhow::bail!("Cache max_entries must be greater than 0");
        }

        Ok(())
    }
}
