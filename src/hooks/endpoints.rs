//! Endpoint query and policy assignment

use async_trait::async_trait;
use serde_json::json;

use crate::models::{ActivityEntry, AssignPolicyRequest, Endpoint};
use crate::services::cache::QueryKey;
use crate::services::mutation::Mutation;
use crate::services::query::{scoped_key, Query};
use crate::services::remote::{decode_first, decode_rows, Filters, RemoteDataClient, SelectQuery};
use crate::services::tenant::Scope;
use crate::utils::DataResult;

pub const ENDPOINTS_TAG: &str = "endpoints";

/// Endpoints of the selected organization, by hostname
#[derive(Debug, Clone, Default)]
pub struct EndpointsQuery;

#[async_trait]
impl Query for EndpointsQuery {
    type Output = Vec<Endpoint>;

    fn key(&self, scope: &Scope) -> QueryKey {
        scoped_key(ENDPOINTS_TAG, scope)
    }

    async fn fetch(&self, remote: &dyn RemoteDataClient, scope: &Scope) -> DataResult<Vec<Endpoint>> {
        let organization_id = scope.require_organization()?;
        let query = SelectQuery::from("endpoints")
            .eq("organization_id", organization_id)
            .order_by("hostname", true);
        decode_rows(remote.select(&query).await?)
    }
}

/// Point an endpoint at a policy (or detach it)
pub struct AssignPolicy;

#[async_trait]
impl Mutation for AssignPolicy {
    type Payload = AssignPolicyRequest;
    type Output = Endpoint;

    fn name(&self) -> &'static str {
        "assign_policy"
    }

    async fn execute(
        &self,
        remote: &dyn RemoteDataClient,
        payload: &AssignPolicyRequest,
    ) -> DataResult<Endpoint> {
        let rows = remote
            .update(
                "endpoints",
                json!({ "policy_id": payload.policy_id }),
                &Filters::new()
                    .eq("id", payload.endpoint_id)
                    .eq("organization_id", payload.organization_id),
            )
            .await?;
        decode_first(rows)
    }

    fn invalidates(&self, payload: &AssignPolicyRequest, _output: &Endpoint) -> Vec<QueryKey> {
        vec![QueryKey::scoped(ENDPOINTS_TAG, payload.organization_id)]
    }

    fn success_message(&self) -> String {
        "Policy assigned".to_string()
    }

    fn error_title(&self) -> String {
        "Failed to assign policy".to_string()
    }

    fn activity(&self, payload: &AssignPolicyRequest, output: &Endpoint) -> Option<ActivityEntry> {
        Some(
            ActivityEntry::new(payload.organization_id, "policy_assigned", "endpoint")
                .with_resource_id(output.id)
                .with_endpoint(output.id)
                .with_details(json!({
                    "hostname": output.hostname,
                    "policy_id": payload.policy_id,
                })),
        )
    }
}
