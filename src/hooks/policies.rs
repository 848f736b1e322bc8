//! Policy query and mutations

use async_trait::async_trait;
use serde_json::json;

use crate::hooks::endpoints::ENDPOINTS_TAG;
use crate::models::{
    ActivityEntry, CreatePolicyRequest, DeletePolicyRequest, Policy, UpdatePolicyRequest,
};
use crate::services::cache::QueryKey;
use crate::services::mutation::Mutation;
use crate::services::query::{scoped_key, Query};
use crate::services::remote::{decode_first, decode_rows, Filters, RemoteDataClient, SelectQuery};
use crate::services::tenant::Scope;
use crate::utils::{DataError, DataResult};

pub const POLICIES_TAG: &str = "policies";

/// Policies of the selected organization, by name
#[derive(Debug, Clone, Default)]
pub struct PoliciesQuery;

#[async_trait]
impl Query for PoliciesQuery {
    type Output = Vec<Policy>;

    fn key(&self, scope: &Scope) -> QueryKey {
        scoped_key(POLICIES_TAG, scope)
    }

    async fn fetch(&self, remote: &dyn RemoteDataClient, scope: &Scope) -> DataResult<Vec<Policy>> {
        let organization_id = scope.require_organization()?;
        let query = SelectQuery::from("policies")
            .eq("organization_id", organization_id)
            .order_by("name", true);
        decode_rows(remote.select(&query).await?)
    }
}

fn policy_filters(id: uuid::Uuid, organization_id: uuid::Uuid) -> Filters {
    Filters::new()
        .eq("id", id)
        .eq("organization_id", organization_id)
}

pub struct CreatePolicy;

#[async_trait]
impl Mutation for CreatePolicy {
    type Payload = CreatePolicyRequest;
    type Output = Policy;

    fn name(&self) -> &'static str {
        "create_policy"
    }

    async fn execute(
        &self,
        remote: &dyn RemoteDataClient,
        payload: &CreatePolicyRequest,
    ) -> DataResult<Policy> {
        let row = serde_json::to_value(payload)?;
        decode_first(remote.insert("policies", row).await?)
    }

    fn invalidates(&self, payload: &CreatePolicyRequest, _output: &Policy) -> Vec<QueryKey> {
        vec![QueryKey::scoped(POLICIES_TAG, payload.organization_id)]
    }

    fn success_message(&self) -> String {
        "Policy created".to_string()
    }

    fn error_title(&self) -> String {
        "Failed to create policy".to_string()
    }

    fn activity(&self, payload: &CreatePolicyRequest, output: &Policy) -> Option<ActivityEntry> {
        Some(
            ActivityEntry::new(payload.organization_id, "policy_created", "policy")
                .with_resource_id(output.id)
                .with_details(json!({ "name": output.name })),
        )
    }
}

pub struct UpdatePolicy;

#[async_trait]
impl Mutation for UpdatePolicy {
    type Payload = UpdatePolicyRequest;
    type Output = Policy;

    fn name(&self) -> &'static str {
        "update_policy"
    }

    async fn execute(
        &self,
        remote: &dyn RemoteDataClient,
        payload: &UpdatePolicyRequest,
    ) -> DataResult<Policy> {
        let patch = payload.patch();
        if patch.as_object().is_some_and(|fields| fields.is_empty()) {
            return Err(DataError::Validation("nothing to update".to_string()));
        }
        let rows = remote
            .update(
                "policies",
                patch,
                &policy_filters(payload.id, payload.organization_id),
            )
            .await?;
        decode_first(rows)
    }

    fn invalidates(&self, payload: &UpdatePolicyRequest, _output: &Policy) -> Vec<QueryKey> {
        vec![QueryKey::scoped(POLICIES_TAG, payload.organization_id)]
    }

    fn success_message(&self) -> String {
        "Policy updated".to_string()
    }

    fn error_title(&self) -> String {
        "Failed to update policy".to_string()
    }

    fn activity(&self, payload: &UpdatePolicyRequest, _output: &Policy) -> Option<ActivityEntry> {
        Some(
            ActivityEntry::new(payload.organization_id, "policy_updated", "policy")
                .with_resource_id(payload.id)
                .with_details(payload.patch()),
        )
    }
}

/// Delete a policy; endpoints pointing at it lose their assignment
pub struct DeletePolicy;

#[async_trait]
impl Mutation for DeletePolicy {
    type Payload = DeletePolicyRequest;
    type Output = ();

    fn name(&self) -> &'static str {
        "delete_policy"
    }

    async fn execute(
        &self,
        remote: &dyn RemoteDataClient,
        payload: &DeletePolicyRequest,
    ) -> DataResult<()> {
        remote
            .delete(
                "policies",
                &policy_filters(payload.id, payload.organization_id),
            )
            .await
    }

    fn invalidates(&self, payload: &DeletePolicyRequest, _output: &()) -> Vec<QueryKey> {
        vec![
            QueryKey::scoped(POLICIES_TAG, payload.organization_id),
            QueryKey::scoped(ENDPOINTS_TAG, payload.organization_id),
        ]
    }

    fn success_message(&self) -> String {
        "Policy deleted".to_string()
    }

    fn error_title(&self) -> String {
        "Failed to delete policy".to_string()
    }

    fn activity(&self, payload: &DeletePolicyRequest, _output: &()) -> Option<ActivityEntry> {
        Some(
            ActivityEntry::new(payload.organization_id, "policy_deleted", "policy")
                .with_resource_id(payload.id),
        )
    }
}
