//! Resource hooks
//!
//! Typed queries and mutations over the dashboard's resources. Each query
//! carries its own cache key, scope predicate and refresh policy; each
//! mutation names the query families it invalidates.

pub mod activity_logs;
pub mod endpoints;
pub mod event_logs;
pub mod policies;
pub mod router_tokens;
pub mod router_uptime;

pub use activity_logs::ActivityLogsQuery;
pub use endpoints::{AssignPolicy, EndpointsQuery};
pub use event_logs::EventLogsQuery;
pub use policies::{CreatePolicy, DeletePolicy, PoliciesQuery, UpdatePolicy};
pub use router_tokens::{CreateEnrollmentToken, DeleteEnrollmentToken, EnrollmentTokensQuery};
pub use router_uptime::{RouterUptimeBatchQuery, RouterUptimeQuery};
