//! Query layer
//!
//! A [`Query`] describes one read against the remote store: its cache key,
//! whether it can run under the current tenant scope, how to fetch it and
//! how long the result stays fresh. [`QueryClient`] runs queries through the
//! shared cache; [`QueryObserver`] is the per-view handle that tracks status,
//! follows tenant changes and discards superseded responses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock as StdRwLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::services::cache::{CacheEvent, QueryCache, QueryKey};
use crate::services::remote::RemoteDataClient;
use crate::services::tenant::{Scope, TenantContext};
use crate::utils::{DataError, DataResult};

/// A cacheable read against the remote store
#[async_trait]
pub trait Query: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    /// Resource tag followed by every parameter that affects the result
    fn key(&self, scope: &Scope) -> QueryKey;

    /// Whether the query may run. Organization-scoped by default.
    fn enabled(&self, scope: &Scope) -> bool {
        scope.organization().is_some()
    }

    async fn fetch(
        &self,
        remote: &dyn RemoteDataClient,
        scope: &Scope,
    ) -> DataResult<Self::Output>;

    fn stale_time(&self, config: &CacheConfig) -> Duration {
        config.default_stale_time()
    }

    fn refetch_interval(&self, _config: &CacheConfig) -> Option<Duration> {
        None
    }

    fn refetch_on_focus(&self, config: &CacheConfig) -> bool {
        config.refetch_on_focus
    }
}

/// Key of an organization-scoped resource under `scope`
pub fn scoped_key(tag: &str, scope: &Scope) -> QueryKey {
    match scope.organization() {
        Some(organization_id) => QueryKey::scoped(tag, organization_id),
        None => QueryKey::new(tag).with("-"),
    }
}

/// Observable state of a query
#[derive(Debug)]
pub enum QueryStatus<T> {
    /// Disabled: a required parameter is missing, nothing was requested
    Idle,
    /// First fetch in flight, nothing to show yet
    Pending,
    /// Data is available; `is_stale` while a background refresh may replace it
    Success { data: Arc<T>, is_stale: bool },
    Error(DataError),
}

impl<T> Clone for QueryStatus<T> {
    fn clone(&self) -> Self {
        match self {
            QueryStatus::Idle => QueryStatus::Idle,
            QueryStatus::Pending => QueryStatus::Pending,
            QueryStatus::Success { data, is_stale } => QueryStatus::Success {
                data: Arc::clone(data),
                is_stale: *is_stale,
            },
            QueryStatus::Error(err) => QueryStatus::Error(err.clone()),
        }
    }
}

impl<T> QueryStatus<T> {
    pub fn data(&self) -> Option<Arc<T>> {
        match self {
            QueryStatus::Success { data, .. } => Some(Arc::clone(data)),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&DataError> {
        match self {
            QueryStatus::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, QueryStatus::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, QueryStatus::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryStatus::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryStatus::Error(_))
    }
}

/// Runs queries through the shared cache
#[derive(Clone)]
pub struct QueryClient {
    remote: Arc<dyn RemoteDataClient>,
    cache: Arc<QueryCache>,
    tenant: TenantContext,
    config: CacheConfig,
}

impl QueryClient {
    pub fn new(remote: Arc<dyn RemoteDataClient>, tenant: TenantContext, config: CacheConfig) -> Self {
        let cache = Arc::new(QueryCache::new(config.max_entries));
        Self {
            remote,
            cache,
            tenant,
            config,
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteDataClient> {
        &self.remote
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn scope(&self) -> Scope {
        self.tenant.scope()
    }

    /// Run a query once, serving fresh cached data when available.
    ///
    /// Returns `Ok(None)` without touching the remote store when the query is
    /// disabled under the current scope.
    pub async fn fetch_query<Q: Query>(&self, query: &Q) -> DataResult<Option<Arc<Q::Output>>> {
        let scope = self.scope();
        if !query.enabled(&scope) {
            debug!("Query disabled under current scope");
            return Ok(None);
        }

        let key = query.key(&scope);
        if let Some(cached) = self.cache.get::<Q::Output>(&key).await {
            if !cached.is_stale {
                debug!(key = %key, "Serving cached query result");
                return Ok(Some(cached.data));
            }
        }

        let data = Arc::new(query.fetch(self.remote.as_ref(), &scope).await?);
        if self.scope() == scope {
            self.cache
                .set(key, Arc::clone(&data), query.stale_time(&self.config))
                .await;
        } else {
            debug!(key = %key, "Scope changed during fetch, result not cached");
        }
        Ok(Some(data))
    }

    /// Mark every cached result under `prefix` stale and notify mounted views
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        self.cache.invalidate(prefix).await
    }

    /// Switch the selected organization.
    ///
    /// Results cached for other organizations are dropped and those of the
    /// newly selected one are marked stale before the change is published,
    /// so no view can read a previous tenant's data as current.
    pub async fn select_organization(&self, organization_id: Option<Uuid>) -> bool {
        if self.tenant.current() == organization_id {
            return false;
        }

        let removed = self
            .cache
            .remove_where(|key| key.is_scoped() && key.organization() != organization_id)
            .await;
        self.cache
            .invalidate_where(|key| key.is_scoped() && key.organization() == organization_id)
            .await;
        debug!(removed = removed, "Dropped cached results of previous organization");

        self.tenant.select(organization_id)
    }

    /// The dashboard regained user attention
    pub fn on_focus(&self) {
        self.cache.notify_focus();
    }
}

struct ObserverState<T> {
    key: Option<QueryKey>,
    status: QueryStatus<T>,
}

struct ObserverInner<Q: Query> {
    client: QueryClient,
    query: StdRwLock<Arc<Q>>,
    /// Bumped by every run; only the latest run may publish its outcome
    generation: AtomicU64,
    state: RwLock<ObserverState<Q::Output>>,
}

impl<Q: Query> ObserverInner<Q> {
    fn current_query(&self) -> Arc<Q> {
        Arc::clone(&self.query.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

impl<Q: Query> Drop for ObserverInner<Q> {
    fn drop(&mut self) {
        if let Some(key) = self.state.get_mut().key.take() {
            self.client.cache().unmount(&key);
        }
    }
}

/// Per-view handle on a query.
///
/// Mounts its current key in the cache while alive. When the key changes
/// (new parameters or a new tenant) the newer run supersedes any fetch still
/// in flight: late responses for an older run never overwrite the status.
pub struct QueryObserver<Q: Query> {
    inner: Arc<ObserverInner<Q>>,
}

impl<Q: Query> Clone for QueryObserver<Q> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

enum Trigger {
    Interval,
    Cache(CacheEvent),
    Lagged,
    TenantChanged,
}

impl<Q: Query> QueryObserver<Q> {
    pub fn new(client: QueryClient, query: Q) -> Self {
        Self {
            inner: Arc::new(ObserverInner {
                client,
                query: StdRwLock::new(Arc::new(query)),
                generation: AtomicU64::new(0),
                state: RwLock::new(ObserverState {
                    key: None,
                    status: QueryStatus::Idle,
                }),
            }),
        }
    }

    /// Current status under the current scope.
    ///
    /// Data loaded for a key the query no longer maps to (another tenant, or
    /// parameters since replaced) is never reported: the status reads
    /// `Pending` until the next run, or `Idle` if the query is now disabled.
    pub async fn status(&self) -> QueryStatus<Q::Output> {
        let state = self.inner.state.read().await;
        let Some(ref loaded) = state.key else {
            return state.status.clone();
        };

        let query = self.inner.current_query();
        let scope = self.inner.client.scope();
        if !query.enabled(&scope) {
            QueryStatus::Idle
        } else if query.key(&scope) != *loaded {
            QueryStatus::Pending
        } else {
            state.status.clone()
        }
    }

    pub async fn key(&self) -> Option<QueryKey> {
        self.inner.state.read().await.key.clone()
    }

    /// Fetch unless fresh data is cached
    pub async fn refresh(&self) -> QueryStatus<Q::Output> {
        self.run(false).await
    }

    /// Fetch even if cached data is fresh
    pub async fn refetch(&self) -> QueryStatus<Q::Output> {
        self.run(true).await
    }

    /// Replace the query parameters and load the new key
    pub async fn set_query(&self, query: Q) -> QueryStatus<Q::Output> {
        *self
            .inner
            .query
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(query);
        self.run(false).await
    }

    /// Publish a status for `generation`, remounting if the key moved.
    ///
    /// Returns false when a newer run already took over.
    async fn publish(
        &self,
        generation: u64,
        key: Option<QueryKey>,
        status: QueryStatus<Q::Output>,
    ) -> bool {
        let cache = self.inner.client.cache();
        let mut state = self.inner.state.write().await;
        if !self.inner.is_current(generation) {
            return false;
        }
        if state.key != key {
            if let Some(old) = state.key.take() {
                cache.unmount(&old);
            }
            if let Some(ref new) = key {
                cache.mount(new);
            }
            state.key = key;
        }
        state.status = status;
        true
    }

    async fn run(&self, force: bool) -> QueryStatus<Q::Output> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let client = &self.inner.client;
        let query = self.inner.current_query();
        let scope = client.scope();

        if !query.enabled(&scope) {
            self.publish(generation, None, QueryStatus::Idle).await;
            return self.status().await;
        }

        let key = query.key(&scope);
        let waiting = match client.cache().get::<Q::Output>(&key).await {
            Some(cached) if !cached.is_stale && !force => {
                let status = QueryStatus::Success {
                    data: cached.data,
                    is_stale: false,
                };
                self.publish(generation, Some(key), status).await;
                return self.status().await;
            }
            // Keep showing what we have while revalidating
            Some(cached) => QueryStatus::Success {
                data: cached.data,
                is_stale: true,
            },
            None => QueryStatus::Pending,
        };
        if !self.publish(generation, Some(key.clone()), waiting).await {
            return self.status().await;
        }

        debug!(key = %key, "Fetching query");
        let status = match query.fetch(client.remote().as_ref(), &scope).await {
            Ok(data) => {
                let data = Arc::new(data);
                client
                    .cache()
                    .set_if_mounted(key.clone(), Arc::clone(&data), query.stale_time(client.config()))
                    .await;
                QueryStatus::Success {
                    data,
                    is_stale: false,
                }
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Query failed");
                QueryStatus::Error(err)
            }
        };

        if !self.publish(generation, Some(key.clone()), status).await {
            debug!(key = %key, "Discarding superseded query result");
        }
        self.status().await
    }

    /// Take over data another fetch stored under the current key
    async fn adopt(&self, key: &QueryKey) {
        let Some(cached) = self.inner.client.cache().get::<Q::Output>(key).await else {
            return;
        };
        let mut state = self.inner.state.write().await;
        if state.key.as_ref() == Some(key) {
            state.status = QueryStatus::Success {
                data: cached.data,
                is_stale: cached.is_stale,
            };
        }
    }

    async fn handle(&self, trigger: Trigger, refetch_on_focus: bool) {
        let current = self.key().await;
        match trigger {
            Trigger::Interval => {
                self.refetch().await;
            }
            Trigger::TenantChanged | Trigger::Lagged => {
                self.refresh().await;
            }
            Trigger::Cache(CacheEvent::Invalidated(keys)) => {
                if current.is_some_and(|key| keys.contains(&key)) {
                    self.refresh().await;
                }
            }
            Trigger::Cache(CacheEvent::Updated(key)) => {
                if current.as_ref() == Some(&key) {
                    self.adopt(&key).await;
                }
            }
            Trigger::Cache(CacheEvent::FocusRegained) => {
                if refetch_on_focus {
                    self.refresh().await;
                }
            }
            Trigger::Cache(CacheEvent::Removed(_)) => {}
        }
    }

    /// Keep this observer current in the background.
    ///
    /// The task refetches on the query's interval, revalidates when its key is
    /// invalidated, the tenant changes or focus returns, and exits once every
    /// handle on the observer has been dropped.
    pub fn spawn_auto_refresh(&self) -> JoinHandle<()> {
        let weak: Weak<ObserverInner<Q>> = Arc::downgrade(&self.inner);
        let client = &self.inner.client;
        let mut events = client.cache().subscribe();
        let mut tenant = client.tenant().subscribe();
        let query = self.inner.current_query();
        let interval = query.refetch_interval(client.config());
        let refetch_on_focus = query.refetch_on_focus(client.config());

        tokio::spawn(async move {
            let mut ticker = interval.map(|period| {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });

            loop {
                let trigger = tokio::select! {
                    _ = async {
                        match ticker.as_mut() {
                            Some(ticker) => {
                                ticker.tick().await;
                            }
                            None => std::future::pending::<()>().await,
                        }
                    } => Trigger::Interval,
                    event = events.recv() => match event {
                        Ok(event) => Trigger::Cache(event),
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped = skipped, "Observer lagged behind cache events");
                            Trigger::Lagged
                        }
                        Err(RecvError::Closed) => break,
                    },
                    changed = tenant.changed() => match changed {
                        Ok(()) => Trigger::TenantChanged,
                        Err(_) => break,
                    },
                };

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let observer = QueryObserver { inner };
                observer.handle(trigger, refetch_on_focus).await;
            }
            debug!("Auto refresh stopped");
        })
    }
}
