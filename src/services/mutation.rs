//! Mutation layer
//!
//! A [`Mutation`] performs exactly one write against the remote store. The
//! [`MutationRunner`] validates the payload, runs the write once, and only on
//! confirmed success invalidates the affected queries and records activity.
//! Every outcome is reported to the user through the [`Notifier`].

use async_trait::async_trait;
use tracing::{info, warn};
use validator::Validate;

use crate::models::ActivityEntry;
use crate::services::activity::ActivityLogger;
use crate::services::cache::QueryKey;
use crate::services::notify::Notifier;
use crate::services::query::QueryClient;
use crate::services::remote::RemoteDataClient;
use crate::utils::{DataError, DataResult};

#[async_trait]
pub trait Mutation: Send + Sync {
    type Payload: Validate + Send + Sync;
    type Output: Send + Sync;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        remote: &dyn RemoteDataClient,
        payload: &Self::Payload,
    ) -> DataResult<Self::Output>;

    /// Query families whose results the write could change
    fn invalidates(&self, payload: &Self::Payload, output: &Self::Output) -> Vec<QueryKey>;

    fn success_message(&self) -> String;

    /// Toast title on failure; the description carries the error
    fn error_title(&self) -> String;

    /// Audit entry recorded after a successful write
    fn activity(&self, _payload: &Self::Payload, _output: &Self::Output) -> Option<ActivityEntry> {
        None
    }
}

#[derive(Clone)]
pub struct MutationRunner {
    client: QueryClient,
    notifier: Notifier,
    activity: ActivityLogger,
}

impl MutationRunner {
    pub fn new(client: QueryClient, notifier: Notifier, activity: ActivityLogger) -> Self {
        Self {
            client,
            notifier,
            activity,
        }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    /// Run a mutation once. Failures are not retried and leave the cache untouched.
    pub async fn mutate<M: Mutation>(&self, mutation: &M, payload: M::Payload) -> DataResult<M::Output> {
        if let Err(errors) = payload.validate() {
            let err = DataError::from(errors);
            self.notifier.error(mutation.error_title(), err.to_string());
            return Err(err);
        }

        let output = match mutation.execute(self.client.remote().as_ref(), &payload).await {
            Ok(output) => output,
            Err(err) => {
                warn!(mutation = mutation.name(), error = %err, "Mutation failed");
                self.notifier.error(mutation.error_title(), err.to_string());
                return Err(err);
            }
        };

        for key in mutation.invalidates(&payload, &output) {
            self.client.invalidate(&key).await;
        }
        info!(mutation = mutation.name(), "Mutation succeeded");
        self.notifier.success(mutation.success_message());

        if let Some(entry) = mutation.activity(&payload, &output) {
            self.activity.log(entry);
        }
        Ok(output)
    }
}
