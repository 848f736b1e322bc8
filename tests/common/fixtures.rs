//! Test fixtures
//!
//! Provides row payloads as the hosted store returns them.

use serde_json::{json, Value};
use uuid::Uuid;

pub fn organization_row(id: Uuid, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "slug": name.to_lowercase().replace(' ', "-"),
        "created_at": "2024-01-01T00:00:00Z"
    })
}

pub fn endpoint_row(id: Uuid, organization_id: Uuid, hostname: &str) -> Value {
    json!({
        "id": id,
        "hostname": hostname,
        "organization_id": organization_id,
        "policy_id": null,
        "os_version": "Windows 11 23H2",
        "agent_version": "2.4.1",
        "is_online": true,
        "last_seen": "2024-05-01T09:59:00Z",
        "created_at": "2024-03-01T00:00:00Z"
    })
}

pub fn policy_row(id: Uuid, organization_id: Uuid, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "organization_id": organization_id,
        "is_default": false,
        "created_at": "2024-03-01T00:00:00Z"
    })
}

pub fn activity_row(organization_id: Uuid, action: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "organization_id": organization_id,
        "user_id": null,
        "endpoint_id": null,
        "action": action,
        "resource_type": "policy",
        "resource_id": null,
        "details": null,
        "ip_address": "10.0.0.5",
        "created_at": "2024-05-01T10:00:00Z"
    })
}

pub fn event_log_row(organization_id: Uuid, endpoint_id: Uuid, hostname: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "endpoint_id": endpoint_id,
        "event_id": 3077,
        "log_source": "Microsoft-Windows-CodeIntegrity/Operational",
        "level": "Error",
        "message": "Code Integrity blocked an unsigned binary",
        "event_time": "2024-05-01T10:00:00Z",
        "provider_name": "Microsoft-Windows-CodeIntegrity",
        "task_category": null,
        "raw_data": null,
        "created_at": "2024-05-01T10:00:02Z",
        "endpoints": {
            "hostname": hostname,
            "organization_id": organization_id,
            "policy_id": null
        }
    })
}

pub fn token_row(organization_id: Uuid, label: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "organization_id": organization_id,
        "token": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
        "label": label,
        "is_active": true,
        "max_uses": null,
        "use_count": 0,
        "expires_at": null,
        "created_by": null,
        "created_at": "2024-04-01T00:00:00Z"
    })
}

/// Upstream model list used by the proxy tests
pub fn upstream_models() -> Value {
    json!({
        "object": "list",
        "data": [
            { "id": "gpt-4o", "object": "model", "created": 200, "owned_by": "system" },
            { "id": "gpt-3.5-instruct", "object": "model", "created": 300, "owned_by": "system" },
            { "id": "gpt-4", "object": "model", "created": 100, "owned_by": "system" }
        ]
    })
}
