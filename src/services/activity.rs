//! Activity logging side channel
//!
//! Audit entries are written through the `log_activity` procedure on a
//! detached task. A failed write is counted and logged, never returned to the
//! action that triggered it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::ActivityEntry;
use crate::services::remote::RemoteDataClient;

const LOG_ACTIVITY_RPC: &str = "log_activity";

#[derive(Clone)]
pub struct ActivityLogger {
    remote: Arc<dyn RemoteDataClient>,
    failures: Arc<AtomicU64>,
}

impl ActivityLogger {
    pub fn new(remote: Arc<dyn RemoteDataClient>) -> Self {
        Self {
            remote,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record an entry without waiting for the write
    pub fn log(&self, entry: ActivityEntry) -> JoinHandle<()> {
        let logger = self.clone();
        tokio::spawn(async move {
            logger.log_and_wait(entry).await;
        })
    }

    /// Record an entry and report whether the write succeeded
    pub async fn log_and_wait(&self, entry: ActivityEntry) -> bool {
        match self.remote.rpc(LOG_ACTIVITY_RPC, entry.rpc_params()).await {
            Ok(_) => {
                debug!(action = %entry.action, resource_type = %entry.resource_type, "Activity logged");
                true
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    action = %entry.action,
                    resource_type = %entry.resource_type,
                    error = %err,
                    "Failed to log activity"
                );
                false
            }
        }
    }

    /// Writes that failed since startup
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}
