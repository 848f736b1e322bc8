//! Router uptime statistics
//!
//! Uptime is computed server-side by `get_router_uptime_stats` over a
//! trailing window. Router ids are globally unique, so these queries are
//! keyed by router rather than organization.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::RouterUptimeStats;
use crate::services::cache::QueryKey;
use crate::services::query::Query;
use crate::services::remote::RemoteDataClient;
use crate::services::tenant::Scope;
use crate::utils::DataResult;

pub const ROUTER_UPTIME_TAG: &str = "router-uptime";
pub const ROUTER_UPTIME_BATCH_TAG: &str = "router-uptime-batch";
pub const DEFAULT_UPTIME_WINDOW_DAYS: u32 = 30;

const UPTIME_RPC: &str = "get_router_uptime_stats";

/// Normalize the procedure result: a row set, a single row, or nothing
fn first_stats(value: Value) -> DataResult<RouterUptimeStats> {
    let row = match value {
        Value::Array(rows) => rows.into_iter().next(),
        Value::Null => None,
        other => Some(other),
    };
    match row {
        Some(row) => Ok(serde_json::from_value(row)?),
        None => Ok(RouterUptimeStats::default()),
    }
}

async fn fetch_stats(
    remote: &dyn RemoteDataClient,
    router_id: Uuid,
    days: u32,
) -> DataResult<RouterUptimeStats> {
    let result = remote
        .rpc(
            UPTIME_RPC,
            json!({ "p_router_id": router_id, "p_days": days }),
        )
        .await?;
    first_stats(result)
}

/// Uptime of a single router; disabled until a router is chosen
#[derive(Debug, Clone)]
pub struct RouterUptimeQuery {
    pub router_id: Option<Uuid>,
    pub days: u32,
}

impl RouterUptimeQuery {
    pub fn new(router_id: Option<Uuid>) -> Self {
        Self {
            router_id,
            days: DEFAULT_UPTIME_WINDOW_DAYS,
        }
    }
}

#[async_trait]
impl Query for RouterUptimeQuery {
    type Output = RouterUptimeStats;

    fn key(&self, _scope: &Scope) -> QueryKey {
        QueryKey::new(ROUTER_UPTIME_TAG)
            .with_opt(self.router_id)
            .with(self.days)
    }

    fn enabled(&self, _scope: &Scope) -> bool {
        self.router_id.is_some()
    }

    async fn fetch(
        &self,
        remote: &dyn RemoteDataClient,
        _scope: &Scope,
    ) -> DataResult<RouterUptimeStats> {
        match self.router_id {
            Some(router_id) => fetch_stats(remote, router_id, self.days).await,
            None => Ok(RouterUptimeStats::default()),
        }
    }
}

/// Uptime of several routers at once.
///
/// Lookups run concurrently; a router whose lookup fails is left out of the
/// mapping instead of failing the batch. Only when every lookup fails does
/// the batch fail, with the last error seen.
#[derive(Debug, Clone)]
pub struct RouterUptimeBatchQuery {
    router_ids: Vec<Uuid>,
    pub days: u32,
}

impl RouterUptimeBatchQuery {
    pub fn new(router_ids: impl IntoIterator<Item = Uuid>) -> Self {
        let mut router_ids: Vec<Uuid> = router_ids.into_iter().collect();
        router_ids.sort();
        router_ids.dedup();
        Self {
            router_ids,
            days: DEFAULT_UPTIME_WINDOW_DAYS,
        }
    }

    pub fn router_ids(&self) -> &[Uuid] {
        &self.router_ids
    }
}

#[async_trait]
impl Query for RouterUptimeBatchQuery {
    type Output = HashMap<Uuid, RouterUptimeStats>;

    fn key(&self, _scope: &Scope) -> QueryKey {
        let ids = self
            .router_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        QueryKey::new(ROUTER_UPTIME_BATCH_TAG)
            .with(ids)
            .with(self.days)
    }

    fn enabled(&self, _scope: &Scope) -> bool {
        !self.router_ids.is_empty()
    }

    async fn fetch(
        &self,
        remote: &dyn RemoteDataClient,
        _scope: &Scope,
    ) -> DataResult<HashMap<Uuid, RouterUptimeStats>> {
        let lookups = self.router_ids.iter().map(|&router_id| async move {
            (router_id, fetch_stats(remote, router_id, self.days).await)
        });

        let mut stats = HashMap::with_capacity(self.router_ids.len());
        let mut last_error = None;
        for (router_id, result) in join_all(lookups).await {
            match result {
                Ok(router_stats) => {
                    stats.insert(router_id, router_stats);
                }
                Err(err) => {
                    debug!(router_id = %router_id, error = %err, "Uptime lookup failed, omitting router");
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if stats.is_empty() => {
                warn!(routers = self.router_ids.len(), "Every uptime lookup in the batch failed");
                Err(err)
            }
            _ => Ok(stats),
        }
    }
}
