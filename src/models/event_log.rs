//! Endpoint event log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Telemetry record reported by an endpoint agent, joined with its owning endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointEventLog {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    /// Windows event identifier
    pub event_id: i64,
    /// Channel the event was read from (e.g. `Microsoft-Windows-CodeIntegrity/Operational`)
    pub log_source: String,
    pub level: String,
    pub message: String,
    pub event_time: DateTime<Utc>,
    pub provider_name: Option<String>,
    pub task_category: Option<String>,
    pub raw_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "endpoints")]
    pub endpoint: EventLogEndpoint,
}

/// Columns embedded from the owning endpoint row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventLogEndpoint {
    pub hostname: String,
    pub organization_id: Uuid,
    pub policy_id: Option<Uuid>,
}

impl EndpointEventLog {
    pub fn is_error(&self) -> bool {
        matches!(
            self.level.to_ascii_lowercase().as_str(),
            "error" | "critical"
        )
    }
}
