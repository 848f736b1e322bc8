//! Endpoint event log query
//!
//! Near-real-time view: results go stale quickly and the observer refetches
//! on a fixed interval.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::models::EndpointEventLog;
use crate::services::cache::QueryKey;
use crate::services::query::{scoped_key, Query};
use crate::services::remote::{decode_rows, RemoteDataClient, SelectQuery};
use crate::services::tenant::Scope;
use crate::utils::DataResult;

pub const EVENT_LOGS_TAG: &str = "endpoint-event-logs";
pub const DEFAULT_EVENT_LOG_LIMIT: u32 = 100;

/// Owning endpoint columns embedded in every row; `!inner` drops orphaned events
const EVENT_LOG_COLUMNS: &str = "*, endpoints!inner(hostname, organization_id, policy_id)";

#[derive(Debug, Clone)]
pub struct EventLogsQuery {
    /// Restrict to a single endpoint
    pub endpoint_id: Option<Uuid>,
    pub limit: u32,
}

impl Default for EventLogsQuery {
    fn default() -> Self {
        Self {
            endpoint_id: None,
            limit: DEFAULT_EVENT_LOG_LIMIT,
        }
    }
}

impl EventLogsQuery {
    pub fn for_endpoint(endpoint_id: Uuid) -> Self {
        Self {
            endpoint_id: Some(endpoint_id),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Query for EventLogsQuery {
    type Output = Vec<EndpointEventLog>;

    fn key(&self, scope: &Scope) -> QueryKey {
        scoped_key(EVENT_LOGS_TAG, scope)
            .with_opt(self.endpoint_id)
            .with(self.limit)
    }

    async fn fetch(
        &self,
        remote: &dyn RemoteDataClient,
        scope: &Scope,
    ) -> DataResult<Vec<EndpointEventLog>> {
        let organization_id = scope.require_organization()?;
        let endpoint_id = self.endpoint_id;
        let query = SelectQuery::from("endpoint_event_logs")
            .columns(EVENT_LOG_COLUMNS)
            .filter(|filters| {
                let filters = filters.eq("endpoints.organization_id", organization_id);
                match endpoint_id {
                    Some(id) => filters.eq("endpoint_id", id),
                    None => filters,
                }
            })
            .order_by("event_time", false)
            .limit(self.limit);
        decode_rows(remote.select(&query).await?)
    }

    fn stale_time(&self, config: &CacheConfig) -> Duration {
        config.event_log_stale_time()
    }

    fn refetch_interval(&self, config: &CacheConfig) -> Option<Duration> {
        config.event_log_refetch_interval()
    }
}
