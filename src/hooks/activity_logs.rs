//! Activity log query

use async_trait::async_trait;

use crate::models::ActivityLog;
use crate::services::cache::QueryKey;
use crate::services::query::{scoped_key, Query};
use crate::services::remote::{decode_rows, RemoteDataClient, SelectQuery};
use crate::services::tenant::Scope;
use crate::utils::DataResult;

pub const ACTIVITY_LOGS_TAG: &str = "activity-logs";
pub const DEFAULT_ACTIVITY_LOG_LIMIT: u32 = 100;

/// Most recent audit records of the selected organization, newest first
#[derive(Debug, Clone)]
pub struct ActivityLogsQuery {
    pub limit: u32,
}

impl Default for ActivityLogsQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_ACTIVITY_LOG_LIMIT,
        }
    }
}

#[async_trait]
impl Query for ActivityLogsQuery {
    type Output = Vec<ActivityLog>;

    fn key(&self, scope: &Scope) -> QueryKey {
        scoped_key(ACTIVITY_LOGS_TAG, scope).with(self.limit)
    }

    async fn fetch(
        &self,
        remote: &dyn RemoteDataClient,
        scope: &Scope,
    ) -> DataResult<Vec<ActivityLog>> {
        let organization_id = scope.require_organization()?;
        let query = SelectQuery::from("activity_logs")
            .eq("organization_id", organization_id)
            .order_by("created_at", false)
            .limit(self.limit);
        decode_rows(remote.select(&query).await?)
    }
}
