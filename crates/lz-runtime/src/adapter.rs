use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors a remote adapter reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The resource does not exist. The engine treats this as absence.
    #[error("not found")]
    NotFound,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGroup {
    pub id: String,
    pub display_name: String,
    /// Bare id of the parent group, when the remote reports one.
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAssignment {
    /// Full ARM id.
    pub id: String,
    pub name: String,
    pub scope: String,
    pub policy_definition_id: String,
}

/// Everything needed to create one policy assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyAssignmentRequest {
    /// Sanitized name.
    pub name: String,
    pub display_name: String,
    pub policy_definition_id: String,
    /// ARM scope path of the management group.
    pub scope: String,
    /// `None` when the declaration has no parameters.
    pub parameters: Option<BTreeMap<String, serde_json::Value>>,
    pub description: String,
    /// Attach a system-assigned managed identity.
    pub identity: bool,
    /// Required by the remote whenever `identity` is set.
    pub location: Option<String>,
}

impl PolicyAssignmentRequest {
    /// Full ARM id the assignment will have.
    pub fn assignment_id(&self) -> String {
        lz_core::naming::policy_assignment_id(&self.scope, &self.name)
    }
}

/// Read side of the remote. Lookups answer `Ok(None)` (or
/// `Err(RemoteError::NotFound)`) for absent resources.
#[async_trait]
pub trait RemoteLookup: Send + Sync {
    async fn find_management_group(&self, id: &str) -> Result<Option<RemoteGroup>, RemoteError>;

    /// Bare id of the management group the subscription currently sits under.
    async fn find_subscription_group(
        &self,
        subscription_id: &str,
    ) -> Result<Option<String>, RemoteError>;

    async fn find_policy_assignment(
        &self,
        name: &str,
        scope: &str,
    ) -> Result<Option<RemoteAssignment>, RemoteError>;
}

/// Write side of the remote. Every call creates or moves exactly one thing.
#[async_trait]
pub trait RemoteMutator: Send + Sync {
    /// `parent` is a bare group id; `None` lets the remote pick the tenant
    /// root group.
    async fn create_management_group(
        &self,
        id: &str,
        display_name: &str,
        parent: Option<&str>,
    ) -> Result<RemoteGroup, RemoteError>;

    async fn move_subscription(
        &self,
        subscription_id: &str,
        target_group_id: &str,
    ) -> Result<(), RemoteError>;

    async fn create_policy_assignment(
        &self,
        request: &PolicyAssignmentRequest,
    ) -> Result<RemoteAssignment, RemoteError>;
}

/// Both halves of a remote.
pub trait Remote: RemoteLookup + RemoteMutator {}

impl<T: RemoteLookup + RemoteMutator + ?Sized> Remote for T {}
