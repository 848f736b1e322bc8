//! Data layer services

pub mod activity;
pub mod cache;
pub mod dashboard;
pub mod model_proxy;
pub mod mutation;
pub mod notify;
pub mod query;
pub mod remote;
pub mod tenant;

#[cfg(test)]
pub(crate) mod testing;

pub use activity::ActivityLogger;
pub use cache::{CacheEvent, CacheStats, Cached, QueryCache, QueryKey};
pub use dashboard::Dashboard;
pub use model_proxy::{ModelCatalogClient, ModelSummary};
pub use mutation::{Mutation, MutationRunner};
pub use notify::{Notifier, Toast, ToastKind};
pub use query::{scoped_key, Query, QueryClient, QueryObserver, QueryStatus};
pub use remote::{Filters, RemoteDataClient, RestDataClient, SelectQuery};
pub use tenant::{Scope, TenantContext};
