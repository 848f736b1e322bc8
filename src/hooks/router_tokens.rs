//! Router enrollment tokens

use async_trait::async_trait;
use rand::RngCore;
use serde_json::json;

use crate::models::{
    ActivityEntry, CreateEnrollmentTokenRequest, DeleteEnrollmentTokenRequest,
    RouterEnrollmentToken,
};
use crate::services::cache::QueryKey;
use crate::services::mutation::Mutation;
use crate::services::query::{scoped_key, Query};
use crate::services::remote::{decode_first, decode_rows, Filters, RemoteDataClient, SelectQuery};
use crate::services::tenant::Scope;
use crate::utils::DataResult;

pub const ENROLLMENT_TOKENS_TAG: &str = "router-enrollment-tokens";

const TOKEN_BYTES: usize = 32;

/// Generate an enrollment secret: 32 random bytes, hex-encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Enrollment tokens of the selected organization, newest first
#[derive(Debug, Clone, Default)]
pub struct EnrollmentTokensQuery;

#[async_trait]
impl Query for EnrollmentTokensQuery {
    type Output = Vec<RouterEnrollmentToken>;

    fn key(&self, scope: &Scope) -> QueryKey {
        scoped_key(ENROLLMENT_TOKENS_TAG, scope)
    }

    async fn fetch(
        &self,
        remote: &dyn RemoteDataClient,
        scope: &Scope,
    ) -> DataResult<Vec<RouterEnrollmentToken>> {
        let organization_id = scope.require_organization()?;
        let query = SelectQuery::from("router_enrollment_tokens")
            .eq("organization_id", organization_id)
            .order_by("created_at", false);
        decode_rows(remote.select(&query).await?)
    }
}

pub struct CreateEnrollmentToken;

#[async_trait]
impl Mutation for CreateEnrollmentToken {
    type Payload = CreateEnrollmentTokenRequest;
    type Output = RouterEnrollmentToken;

    fn name(&self) -> &'static str {
        "create_enrollment_token"
    }

    async fn execute(
        &self,
        remote: &dyn RemoteDataClient,
        payload: &CreateEnrollmentTokenRequest,
    ) -> DataResult<RouterEnrollmentToken> {
        let row = json!({
            "organization_id": payload.organization_id,
            "token": generate_token(),
            "label": payload.label,
            "is_active": true,
            "max_uses": payload.max_uses,
            "use_count": 0,
            "expires_at": payload.expires_at,
            "created_by": payload.created_by,
        });
        decode_first(remote.insert("router_enrollment_tokens", row).await?)
    }

    fn invalidates(
        &self,
        payload: &CreateEnrollmentTokenRequest,
        _output: &RouterEnrollmentToken,
    ) -> Vec<QueryKey> {
        vec![QueryKey::scoped(ENROLLMENT_TOKENS_TAG, payload.organization_id)]
    }

    fn success_message(&self) -> String {
        "Enrollment token created".to_string()
    }

    fn error_title(&self) -> String {
        "Failed to create enrollment token".to_string()
    }

    fn activity(
        &self,
        payload: &CreateEnrollmentTokenRequest,
        output: &RouterEnrollmentToken,
    ) -> Option<ActivityEntry> {
        // The secret itself never goes into the audit trail
        Some(
            ActivityEntry::new(
                payload.organization_id,
                "enrollment_token_created",
                "router_enrollment_token",
            )
            .with_resource_id(output.id)
            .with_details(json!({ "label": output.label, "max_uses": output.max_uses })),
        )
    }
}

pub struct DeleteEnrollmentToken;

#[async_trait]
impl Mutation for DeleteEnrollmentToken {
    type Payload = DeleteEnrollmentTokenRequest;
    type Output = ();

    fn name(&self) -> &'static str {
        "delete_enrollment_token"
    }

    async fn execute(
        &self,
        remote: &dyn RemoteDataClient,
        payload: &DeleteEnrollmentTokenRequest,
    ) -> DataResult<()> {
        remote
            .delete(
                "router_enrollment_tokens",
                &Filters::new()
                    .eq("id", payload.id)
                    .eq("organization_id", payload.organization_id),
            )
            .await
    }

    fn invalidates(&self, payload: &DeleteEnrollmentTokenRequest, _output: &()) -> Vec<QueryKey> {
        vec![QueryKey::scoped(ENROLLMENT_TOKENS_TAG, payload.organization_id)]
    }

    fn success_message(&self) -> String {
        "Enrollment token deleted".to_string()
    }

    fn error_title(&self) -> String {
        "Failed to delete enrollment token".to_string()
    }

    fn activity(&self, payload: &DeleteEnrollmentTokenRequest, _output: &()) -> Option<ActivityEntry> {
        Some(
            ActivityEntry::new(
                payload.organization_id,
                "enrollment_token_deleted",
                "router_enrollment_token",
            )
            .with_resource_id(payload.id),
        )
    }
}
