//! Tenant context
//!
//! Holds the currently selected organization. The handle is cloned into
//! every consumer instead of living in a global, and changes are published
//! over a watch channel so mounted queries can follow the selection.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::Organization;
use crate::services::remote::{decode_rows, RemoteDataClient, SelectQuery};
use crate::utils::{DataError, DataResult};

/// Snapshot of the tenant selection a fetch runs under
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub organization_id: Option<Uuid>,
}

impl Scope {
    pub fn new(organization_id: Option<Uuid>) -> Self {
        Self { organization_id }
    }

    pub fn organization(&self) -> Option<Uuid> {
        self.organization_id
    }

    pub fn require_organization(&self) -> DataResult<Uuid> {
        self.organization_id.ok_or(DataError::MissingScope)
    }
}

/// Shared handle to the selected organization
#[derive(Clone)]
pub struct TenantContext {
    tx: Arc<watch::Sender<Option<Uuid>>>,
}

impl Default for TenantContext {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TenantContext {
    pub fn new(organization_id: Option<Uuid>) -> Self {
        let (tx, _) = watch::channel(organization_id);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<Uuid> {
        *self.tx.borrow()
    }

    pub fn scope(&self) -> Scope {
        Scope::new(self.current())
    }

    /// Change the selection. Returns whether it changed; last write wins.
    pub fn select(&self, organization_id: Option<Uuid>) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == organization_id {
                false
            } else {
                *current = organization_id;
                true
            }
        });
        if changed {
            info!(organization_id = ?organization_id, "Selected organization changed");
        }
        changed
    }

    pub fn clear(&self) -> bool {
        self.select(None)
    }

    /// Receiver notified on every selection change
    pub fn subscribe(&self) -> watch::Receiver<Option<Uuid>> {
        self.tx.subscribe()
    }

    /// Establish the initial selection.
    ///
    /// A persisted preference wins; otherwise the first organization visible
    /// to the session (by name) is selected. Leaves the selection empty when
    /// the session can see no organization.
    pub async fn initialize(
        &self,
        preferred: Option<Uuid>,
        remote: &dyn RemoteDataClient,
    ) -> DataResult<Option<Uuid>> {
        if let Some(organization_id) = preferred {
            debug!(organization_id = %organization_id, "Using persisted organization");
            self.select(Some(organization_id));
            return Ok(Some(organization_id));
        }

        let query = SelectQuery::from("organizations")
            .columns("id,name,slug,created_at")
            .order_by("name", true)
            .limit(1);
        let organizations: Vec<Organization> = decode_rows(remote.select(&query).await?)?;

        match organizations.first() {
            Some(org) => {
                debug!(organization_id = %org.id, name = %org.name, "Defaulting to first organization");
                self.select(Some(org.id));
                Ok(Some(org.id))
            }
            None => {
                warn!("No organization is visible to this session");
                Ok(None)
            }
        }
    }
}
