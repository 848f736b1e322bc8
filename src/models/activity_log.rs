//! Activity log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Organization-scoped audit record.
///
/// Rows are written by the `log_activity` procedure and are never updated or
/// deleted from this side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityLog {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub endpoint_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An audit entry waiting to be recorded
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub organization_id: Uuid,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub endpoint_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
}

impl ActivityEntry {
    pub fn new(
        organization_id: Uuid,
        action: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            organization_id,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            endpoint_id: None,
            details: None,
        }
    }

    pub fn with_resource_id(mut self, resource_id: impl ToString) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn with_endpoint(mut self, endpoint_id: Uuid) -> Self {
        self.endpoint_id = Some(endpoint_id);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Named parameters of the `log_activity` procedure
    pub fn rpc_params(&self) -> serde_json::Value {
        json!({
            "p_organization_id": self.organization_id,
            "p_action": self.action,
            "p_resource_type": self.resource_type,
            "p_resource_id": self.resource_id,
            "p_endpoint_id": self.endpoint_id,
            "p_details": self.details,
        })
    }
}
