//! Policy models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Application-control policy owned by an organization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub organization_id: Uuid,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePolicyRequest {
    pub organization_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Policy name is required"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdatePolicyRequest {
    pub id: Uuid,
    pub organization_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Policy name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub is_default: Option<bool>,
}

impl UpdatePolicyRequest {
    /// Columns to patch; unset fields are left untouched
    pub fn patch(&self) -> serde_json::Value {
        let mut patch = serde_json::Map::new();
        if let Some(ref name) = self.name {
            patch.insert("name".to_string(), name.clone().into());
        }
        if let Some(ref description) = self.description {
            patch.insert("description".to_string(), description.clone().into());
        }
        if let Some(is_default) = self.is_default {
            patch.insert("is_default".to_string(), is_default.into());
        }
        serde_json::Value::Object(patch)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeletePolicyRequest {
    pub id: Uuid,
    pub organization_id: Uuid,
}
