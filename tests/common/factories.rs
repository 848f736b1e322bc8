//! Test data factories
//!
//! Builds seeded stores and dashboards for data layer tests.

use std::sync::Arc;

use uuid::Uuid;

use endpoint_admin::config::CacheConfig;
use endpoint_admin::services::{Dashboard, TenantContext};

use super::fixtures::*;
use super::mocks::MockRemote;

/// Two organizations with their own endpoints, policies and logs
pub struct SeededStore {
    pub remote: Arc<MockRemote>,
    pub acme: Uuid,
    pub globex: Uuid,
    pub acme_endpoint: Uuid,
    pub globex_endpoint: Uuid,
}

impl SeededStore {
    pub fn new() -> Self {
        let remote = MockRemote::new();
        let acme = Uuid::new_v4();
        let globex = Uuid::new_v4();
        let acme_endpoint = Uuid::new_v4();
        let globex_endpoint = Uuid::new_v4();

        remote.add_rows(
            "organizations",
            vec![organization_row(acme, "Acme"), organization_row(globex, "Globex")],
        );
        remote.add_rows(
            "endpoints",
            vec![
                endpoint_row(acme_endpoint, acme, "acme-ws-01"),
                endpoint_row(globex_endpoint, globex, "globex-ws-01"),
            ],
        );
        remote.add_rows(
            "policies",
            vec![
                policy_row(Uuid::new_v4(), acme, "Acme baseline"),
                policy_row(Uuid::new_v4(), globex, "Globex baseline"),
            ],
        );
        remote.add_rows(
            "activity_logs",
            vec![activity_row(acme, "policy_created"), activity_row(globex, "policy_deleted")],
        );
        remote.add_rows(
            "endpoint_event_logs",
            vec![
                event_log_row(acme, acme_endpoint, "acme-ws-01"),
                event_log_row(globex, globex_endpoint, "globex-ws-01"),
            ],
        );
        remote.add_rows(
            "router_enrollment_tokens",
            vec![token_row(acme, "Acme branch"), token_row(globex, "Globex HQ")],
        );

        Self {
            remote,
            acme,
            globex,
            acme_endpoint,
            globex_endpoint,
        }
    }

    /// Dashboard bound to this store with `organization` selected
    pub fn dashboard(&self, organization: Option<Uuid>) -> Dashboard {
        Dashboard::new(
            self.remote.clone(),
            TenantContext::new(organization),
            &CacheConfig::default(),
        )
    }
}
