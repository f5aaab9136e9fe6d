//! In-memory remote.
//!
//! Backs the tests and `plan --offline`. Keys are compared case-insensitively,
//! as ARM does.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use crate::adapter::{
    PolicyAssignmentRequest, RemoteAssignment, RemoteError, RemoteGroup, RemoteLookup,
    RemoteMutator,
};

/// A recorded mutator call.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationCall {
    CreateManagementGroup {
        id: String,
        display_name: String,
        parent: Option<String>,
    },
    MoveSubscription {
        subscription_id: String,
        target_group_id: String,
    },
    CreatePolicyAssignment(PolicyAssignmentRequest),
}

#[derive(Debug, Default)]
struct State {
    groups: BTreeMap<String, RemoteGroup>,
    /// subscription id -> bare group id
    subscriptions: BTreeMap<String, String>,
    /// full assignment id -> assignment
    assignments: BTreeMap<String, RemoteAssignment>,
}

#[derive(Debug, Default)]
pub struct InMemoryRemote {
    state: RwLock<State>,
    calls: Mutex<Vec<MutationCall>>,
    lookups: AtomicUsize,
    failing_mutations: HashSet<String>,
    failing_lookups: HashSet<String>,
    not_found_as_error: bool,
    require_parents: bool,
}

fn key(id: &str) -> String {
    id.to_ascii_lowercase()
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, id: &str, display_name: &str, parent_id: Option<&str>) -> Self {
        self.write().groups.insert(
            key(id),
            RemoteGroup {
                id: id.to_string(),
                display_name: display_name.to_string(),
                parent_id: parent_id.map(str::to_string),
            },
        );
        self
    }

    pub fn with_subscription(self, subscription_id: &str, group_id: &str) -> Self {
        self.write()
            .subscriptions
            .insert(key(subscription_id), group_id.to_string());
        self
    }

    pub fn with_assignment(self, name: &str, scope: &str, policy_definition_id: &str) -> Self {
        let id = lz_core::naming::policy_assignment_id(scope, name);
        self.write().assignments.insert(
            key(&id),
            RemoteAssignment {
                id,
                name: name.to_string(),
                scope: scope.to_string(),
                policy_definition_id: policy_definition_id.to_string(),
            },
        );
        self
    }

    /// Fail any mutation whose group id, subscription id, assignment name or
    /// assignment id equals `identity`.
    pub fn fail_mutation(mut self, identity: &str) -> Self {
        self.failing_mutations.insert(key(identity));
        self
    }

    /// Fail lookups for `identity` with a non-absence error.
    pub fn fail_lookup(mut self, identity: &str) -> Self {
        self.failing_lookups.insert(key(identity));
        self
    }

    /// Report absence as `Err(RemoteError::NotFound)` instead of `Ok(None)`.
    pub fn not_found_as_error(mut self, enabled: bool) -> Self {
        self.not_found_as_error = enabled;
        self
    }

    /// Reject creations whose parent group (or target group) is missing.
    pub fn require_parents(mut self, enabled: bool) -> Self {
        self.require_parents = enabled;
        self
    }

    pub fn has_group(&self, id: &str) -> bool {
        self.read().groups.contains_key(&key(id))
    }

    pub fn subscription_group(&self, subscription_id: &str) -> Option<String> {
        self.read().subscriptions.get(&key(subscription_id)).cloned()
    }

    pub fn has_assignment(&self, assignment_id: &str) -> bool {
        self.read().assignments.contains_key(&key(assignment_id))
    }

    pub fn calls(&self) -> Vec<MutationCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: MutationCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn check_lookup(&self, identities: &[&str]) -> Result<(), RemoteError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if identities
            .iter()
            .any(|id| self.failing_lookups.contains(&key(id)))
        {
            return Err(RemoteError::Status {
                status: 500,
                message: "injected lookup failure".to_string(),
            });
        }
        Ok(())
    }

    fn check_mutation(&self, identities: &[&str]) -> Result<(), RemoteError> {
        if identities
            .iter()
            .any(|id| self.failing_mutations.contains(&key(id)))
        {
            return Err(RemoteError::Status {
                status: 403,
                message: "injected mutation failure".to_string(),
            });
        }
        Ok(())
    }

    fn absent<T>(&self, found: Option<T>) -> Result<Option<T>, RemoteError> {
        match found {
            None if self.not_found_as_error => Err(RemoteError::NotFound),
            found => Ok(found),
        }
    }

    fn missing_parent(&self, group_id: &str) -> Option<RemoteError> {
        (self.require_parents && !self.has_group(group_id)).then(|| RemoteError::Status {
            status: 400,
            message: format!("parent management group '{}' does not exist", group_id),
        })
    }
}

#[async_trait]
impl RemoteLookup for InMemoryRemote {
    async fn find_management_group(&self, id: &str) -> Result<Option<RemoteGroup>, RemoteError> {
        self.check_lookup(&[id])?;
        let found = self.read().groups.get(&key(id)).cloned();
        self.absent(found)
    }

    async fn find_subscription_group(
        &self,
        subscription_id: &str,
    ) -> Result<Option<String>, RemoteError> {
        self.check_lookup(&[subscription_id])?;
        let found = self.subscription_group(subscription_id);
        self.absent(found)
    }

    async fn find_policy_assignment(
        &self,
        name: &str,
        scope: &str,
    ) -> Result<Option<RemoteAssignment>, RemoteError> {
        let id = lz_core::naming::policy_assignment_id(scope, name);
        self.check_lookup(&[name, id.as_str()])?;
        let found = self.read().assignments.get(&key(&id)).cloned();
        self.absent(found)
    }
}

#[async_trait]
impl RemoteMutator for InMemoryRemote {
    async fn create_management_group(
        &self,
        id: &str,
        display_name: &str,
        parent: Option<&str>,
    ) -> Result<RemoteGroup, RemoteError> {
        self.record(MutationCall::CreateManagementGroup {
            id: id.to_string(),
            display_name: display_name.to_string(),
            parent: parent.map(str::to_string),
        });
        self.check_mutation(&[id])?;
        if let Some(err) = parent.and_then(|p| self.missing_parent(p)) {
            return Err(err);
        }

        let group = RemoteGroup {
            id: id.to_string(),
            display_name: display_name.to_string(),
            parent_id: parent.map(str::to_string),
        };
        self.write().groups.insert(key(id), group.clone());
        Ok(group)
    }

    async fn move_subscription(
        &self,
        subscription_id: &str,
        target_group_id: &str,
    ) -> Result<(), RemoteError> {
        self.record(MutationCall::MoveSubscription {
            subscription_id: subscription_id.to_string(),
            target_group_id: target_group_id.to_string(),
        });
        self.check_mutation(&[subscription_id])?;
        if let Some(err) = self.missing_parent(target_group_id) {
            return Err(err);
        }

        self.write()
            .subscriptions
            .insert(key(subscription_id), target_group_id.to_string());
        Ok(())
    }

    async fn create_policy_assignment(
        &self,
        request: &PolicyAssignmentRequest,
    ) -> Result<RemoteAssignment, RemoteError> {
        self.record(MutationCall::CreatePolicyAssignment(request.clone()));
        let id = request.assignment_id();
        self.check_mutation(&[request.name.as_str(), id.as_str()])?;
        if let Some(err) = self.missing_parent(lz_core::naming::resource_name(&request.scope)) {
            return Err(err);
        }

        let assignment = RemoteAssignment {
            id: id.clone(),
            name: request.name.clone(),
            scope: request.scope.clone(),
            policy_definition_id: request.policy_definition_id.clone(),
        };
        self.write().assignments.insert(key(&id), assignment.clone());
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookups_are_case_insensitive() {
        let remote = InMemoryRemote::new().with_group("Target-ALZ", "ALZ", None);
        let found = remote.find_management_group("target-alz").await.unwrap();
        assert_eq!(found.map(|g| g.id), Some("Target-ALZ".to_string()));
        assert_eq!(remote.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_absence_modes() {
        let remote = InMemoryRemote::new();
        assert_eq!(remote.find_management_group("x").await, Ok(None));

        let remote = InMemoryRemote::new().not_found_as_error(true);
        assert_eq!(
            remote.find_management_group("x").await,
            Err(RemoteError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_require_parents() {
        let remote = InMemoryRemote::new().require_parents(true);
        let err = remote
            .create_management_group("Target-Platform", "Platform", Some("Target-ALZ"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Status { status: 400, .. }));
        // The attempt is still recorded
        assert_eq!(remote.mutation_count(), 1);
        assert!(!remote.has_group("Target-Platform"));
    }

    #[tokio::test]
    async fn test_seeded_assignment_is_found() {
        let scope = lz_core::naming::management_group_scope("Target-ALZ");
        let remote = InMemoryRemote::new().with_assignment("Allowed-Locations", &scope, "def");
        let found = remote
            .find_policy_assignment("Allowed-Locations", &scope)
            .await
            .unwrap()
            .unwrap();
        assert!(remote.has_assignment(&found.id));
    }
}
