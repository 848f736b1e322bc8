//! Endpoint model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A managed device enrolled for monitoring and policy enforcement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Endpoint {
    pub id: Uuid,
    pub hostname: String,
    pub organization_id: Uuid,
    pub policy_id: Option<Uuid>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub agent_version: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Assign a policy to an endpoint, or detach it with `policy_id: None`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssignPolicyRequest {
    pub organization_id: Uuid,
    pub endpoint_id: Uuid,
    pub policy_id: Option<Uuid>,
}
