//! Router enrollment and uptime models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Token a router presents once to enroll itself into an organization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouterEnrollmentToken {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub token: String,
    pub label: String,
    pub is_active: bool,
    pub max_uses: Option<i32>,
    /// Incremented by the backend on each redemption
    pub use_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl RouterEnrollmentToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_uses.is_some_and(|max| self.use_count >= max)
    }

    /// Whether a router could still enroll with this token
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now) && !self.is_exhausted()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateEnrollmentTokenRequest {
    pub organization_id: Uuid,
    #[validate(length(min = 1, max = 120, message = "Token label is required"))]
    pub label: String,
    #[validate(range(min = 1, message = "max_uses must be at least 1"))]
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeleteEnrollmentTokenRequest {
    pub id: Uuid,
    pub organization_id: Uuid,
}

/// Availability aggregate computed by the backend over a trailing window
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RouterUptimeStats {
    pub uptime_percent: Option<f64>,
    pub total_downtime_minutes: Option<f64>,
    pub last_offline_at: Option<DateTime<Utc>>,
    pub last_online_at: Option<DateTime<Utc>>,
    pub current_session_start: Option<DateTime<Utc>>,
}
