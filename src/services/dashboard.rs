//! Dashboard data layer wiring
//!
//! Bundles the handles a dashboard session needs: the query client over the
//! shared cache, the mutation runner, the toast notifier and the activity
//! logger, all bound to one remote client and one tenant context.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{AppConfig, CacheConfig};
use crate::services::activity::ActivityLogger;
use crate::services::mutation::{Mutation, MutationRunner};
use crate::services::notify::Notifier;
use crate::services::query::{Query, QueryClient, QueryObserver};
use crate::services::remote::{RemoteDataClient, RestDataClient};
use crate::services::tenant::TenantContext;
use crate::utils::DataResult;

#[derive(Clone)]
pub struct Dashboard {
    pub queries: QueryClient,
    pub mutations: MutationRunner,
    pub notifier: Notifier,
    pub activity: ActivityLogger,
}

impl Dashboard {
    pub fn new(remote: Arc<dyn RemoteDataClient>, tenant: TenantContext, config: &CacheConfig) -> Self {
        let queries = QueryClient::new(Arc::clone(&remote), tenant, config.clone());
        let notifier = Notifier::new();
        let activity = ActivityLogger::new(remote);
        let mutations = MutationRunner::new(queries.clone(), notifier.clone(), activity.clone());
        Self {
            queries,
            mutations,
            notifier,
            activity,
        }
    }

    /// Connect to the configured backend and establish the initial tenant
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let backend = config
            .backend
            .as_ref()
            .context("No backend configured (set backend.url and backend.anon_key)")?;
        let remote: Arc<dyn RemoteDataClient> = Arc::new(RestDataClient::new(backend)?);

        let tenant = TenantContext::default();
        let organization_id = tenant
            .initialize(config.tenant.default_organization_id, remote.as_ref())
            .await
            .context("Failed to determine the initial organization")?;
        info!(organization_id = ?organization_id, "Dashboard connected");

        Ok(Self::new(remote, tenant, &config.cache))
    }

    pub fn tenant(&self) -> &TenantContext {
        self.queries.tenant()
    }

    /// Mount a query for a view
    pub fn observe<Q: Query>(&self, query: Q) -> QueryObserver<Q> {
        QueryObserver::new(self.queries.clone(), query)
    }

    pub async fn mutate<M: Mutation>(&self, mutation: &M, payload: M::Payload) -> DataResult<M::Output> {
        self.mutations.mutate(mutation, payload).await
    }
}
