//! Convergence of a single declaration.
//!
//! Identity first, then lookup, then (unless simulating) exactly one mutating
//! call. Nothing here returns an error: every path ends in an
//! [`ApplyOutcome`].

use lz_core::naming;
use lz_core::{
    ApplyContext, ApplyError, ApplyOutcome, ApplyState, DesiredResource, GroupParent,
    ManagementGroupSpec, PolicyAssignmentSpec, ResourceKind, SubscriptionPlacementSpec,
};

use crate::adapter::{PolicyAssignmentRequest, Remote, RemoteError};

const UNSET_SUBSCRIPTION: &str = "<unset>";

/// Converge one declaration against the remote.
pub async fn converge<R>(desired: &DesiredResource, ctx: &ApplyContext, remote: &R) -> ApplyOutcome
where
    R: Remote + ?Sized,
{
    let outcome = match desired {
        DesiredResource::ManagementGroup(spec) => converge_group(spec, ctx, remote).await,
        DesiredResource::SubscriptionPlacement(spec) => {
            converge_placement(spec, ctx, remote).await
        }
        DesiredResource::PolicyAssignment(spec) => converge_assignment(spec, ctx, remote).await,
    }
    .in_simulation(ctx.simulate_only);

    match &outcome.state {
        ApplyState::Failed(reason) => tracing::warn!(
            kind = %outcome.kind,
            resource = %outcome.identity,
            simulated = outcome.simulated,
            reason = %reason,
            "Convergence failed"
        ),
        state => tracing::info!(
            kind = %outcome.kind,
            resource = %outcome.identity,
            state = state.label(),
            simulated = outcome.simulated,
            "{}",
            outcome.message
        ),
    }

    outcome
}

/// Identity a declaration converges to. Does not validate.
pub fn qualified_identity(desired: &DesiredResource, ctx: &ApplyContext) -> String {
    match desired {
        DesiredResource::ManagementGroup(spec) => ctx.qualify(&spec.id),
        DesiredResource::SubscriptionPlacement(spec) => {
            let id = spec.subscription_id.trim();
            if id.is_empty() {
                UNSET_SUBSCRIPTION.to_string()
            } else {
                id.to_string()
            }
        }
        DesiredResource::PolicyAssignment(spec) => assignment_identity(spec, ctx),
    }
}

fn assignment_identity(spec: &PolicyAssignmentSpec, ctx: &ApplyContext) -> String {
    naming::policy_assignment_id(
        &naming::management_group_scope(&ctx.qualify(&spec.scope_id)),
        &naming::sanitize_assignment_name(&spec.name),
    )
}

/// Not-found errors are absence, not failure.
fn present<T>(answer: Result<Option<T>, RemoteError>) -> Result<Option<T>, RemoteError> {
    match answer {
        Err(e) if e.is_not_found() => Ok(None),
        other => other,
    }
}

async fn converge_group<R>(
    spec: &ManagementGroupSpec,
    ctx: &ApplyContext,
    remote: &R,
) -> ApplyOutcome
where
    R: Remote + ?Sized,
{
    let kind = ResourceKind::ManagementGroup;
    let identity = ctx.qualify(&spec.id);
    let parent = match &spec.parent {
        Some(GroupParent::Declared(short)) => Some(ctx.qualify(short)),
        Some(GroupParent::Existing(id)) => Some(id.clone()),
        None => None,
    };

    let validated = naming::validate_group_id(&identity)
        .and_then(|_| parent.as_deref().map_or(Ok(()), naming::validate_group_id));
    if let Err(e) = validated {
        return ApplyOutcome::failed(kind, identity, &e);
    }

    match present(remote.find_management_group(&identity).await) {
        Ok(Some(_)) => {
            return ApplyOutcome::new(
                kind,
                identity,
                ApplyState::AlreadyExists,
                "management group already exists",
            );
        }
        Ok(None) => {}
        Err(e) => {
            return ApplyOutcome::failed(kind, identity.clone(), &ApplyError::lookup_failed(identity, e));
        }
    }

    let under = parent.as_deref().unwrap_or("tenant root");
    if ctx.simulate_only {
        return ApplyOutcome::new(
            kind,
            identity,
            ApplyState::WouldCreate,
            format!("would create management group '{}' under {}", spec.display_name, under),
        );
    }

    match remote
        .create_management_group(&identity, &spec.display_name, parent.as_deref())
        .await
    {
        Ok(_) => ApplyOutcome::new(
            kind,
            identity,
            ApplyState::Created,
            format!("created management group '{}' under {}", spec.display_name, under),
        ),
        Err(e) => ApplyOutcome::failed(kind, identity.clone(), &ApplyError::mutation_failed(identity, e)),
    }
}

async fn converge_placement<R>(
    spec: &SubscriptionPlacementSpec,
    ctx: &ApplyContext,
    remote: &R,
) -> ApplyOutcome
where
    R: Remote + ?Sized,
{
    let kind = ResourceKind::SubscriptionPlacement;
    let subscription_id = spec.subscription_id.trim();
    if subscription_id.is_empty() {
        return ApplyOutcome::new(
            kind,
            UNSET_SUBSCRIPTION,
            ApplyState::Skipped("no subscription id".to_string()),
            format!("no subscription id configured for {}", ctx.qualify(&spec.target_group_id)),
        );
    }

    let target = ctx.qualify(&spec.target_group_id);
    if let Err(e) = naming::validate_group_id(&target) {
        return ApplyOutcome::failed(kind, subscription_id, &e);
    }

    let current = match present(remote.find_subscription_group(subscription_id).await) {
        Ok(current) => current,
        Err(e) => {
            return ApplyOutcome::failed(
                kind,
                subscription_id,
                &ApplyError::lookup_failed(subscription_id, e),
            );
        }
    };

    if current
        .as_deref()
        .is_some_and(|group| group.eq_ignore_ascii_case(&target))
    {
        return ApplyOutcome::new(
            kind,
            subscription_id,
            ApplyState::AlreadyExists,
            format!("subscription already under {}", target),
        );
    }

    let from = current
        .as_deref()
        .map(|g| format!(" from {}", g))
        .unwrap_or_default();
    if ctx.simulate_only {
        return ApplyOutcome::new(
            kind,
            subscription_id,
            ApplyState::WouldCreate,
            format!("would move subscription{} to {}", from, target),
        );
    }

    match remote.move_subscription(subscription_id, &target).await {
        Ok(()) => ApplyOutcome::new(
            kind,
            subscription_id,
            ApplyState::Created,
            format!("moved subscription{} to {}", from, target),
        ),
        Err(e) => ApplyOutcome::failed(
            kind,
            subscription_id,
            &ApplyError::mutation_failed(subscription_id, e),
        ),
    }
}

/// Build the creation request, rejecting what the remote would reject.
fn assignment_request(
    spec: &PolicyAssignmentSpec,
    ctx: &ApplyContext,
) -> Result<PolicyAssignmentRequest, ApplyError> {
    let name = naming::assignment_name(&spec.name)?;
    let scope_group = ctx.qualify(&spec.scope_id);
    naming::validate_group_id(&scope_group)?;

    let location = if spec.requires_identity {
        let region = spec
            .location
            .clone()
            .unwrap_or_else(|| ctx.default_region.clone());
        if region.trim().is_empty() {
            return Err(ApplyError::invalid(format!(
                "policy assignment '{}' needs a managed identity but no region is configured",
                name
            )));
        }
        Some(region)
    } else {
        None
    };

    Ok(PolicyAssignmentRequest {
        name,
        display_name: spec.display_name.clone(),
        policy_definition_id: spec.policy_definition_id.clone(),
        scope: naming::management_group_scope(&scope_group),
        parameters: (!spec.parameters.is_empty()).then(|| spec.parameters.clone()),
        description: spec.description.clone(),
        identity: spec.requires_identity,
        location,
    })
}

async fn converge_assignment<R>(
    spec: &PolicyAssignmentSpec,
    ctx: &ApplyContext,
    remote: &R,
) -> ApplyOutcome
where
    R: Remote + ?Sized,
{
    let kind = ResourceKind::PolicyAssignment;
    let request = match assignment_request(spec, ctx) {
        Ok(request) => request,
        Err(e) => {
            return ApplyOutcome::failed(kind, assignment_identity(spec, ctx), &e);
        }
    };
    let identity = request.assignment_id();

    match present(remote.find_policy_assignment(&request.name, &request.scope).await) {
        Ok(Some(_)) => {
            return ApplyOutcome::new(
                kind,
                identity,
                ApplyState::AlreadyExists,
                format!("policy assignment '{}' already exists", request.display_name),
            );
        }
        Ok(None) => {}
        Err(e) => {
            return ApplyOutcome::failed(kind, identity.clone(), &ApplyError::lookup_failed(identity, e));
        }
    }

    if ctx.simulate_only {
        return ApplyOutcome::new(
            kind,
            identity,
            ApplyState::WouldCreate,
            format!("would create policy assignment '{}'", request.display_name),
        );
    }

    match remote.create_policy_assignment(&request).await {
        Ok(_) => ApplyOutcome::new(
            kind,
            identity,
            ApplyState::Created,
            format!("created policy assignment '{}'", request.display_name),
        ),
        Err(e) => ApplyOutcome::failed(kind, identity.clone(), &ApplyError::mutation_failed(identity, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryRemote, MutationCall};
    use std::collections::BTreeMap;

    fn ctx() -> ApplyContext {
        ApplyContext::new("Target", "westeurope")
    }

    fn root() -> DesiredResource {
        DesiredResource::management_group("ALZ", "Azure Landing Zones", None).unwrap()
    }

    fn assignment(name: &str, requires_identity: bool) -> DesiredResource {
        let mut parameters = BTreeMap::new();
        if !requires_identity {
            parameters.insert("tagName".to_string(), serde_json::json!("CostCenter"));
        }
        DesiredResource::policy_assignment(PolicyAssignmentSpec {
            name: name.to_string(),
            display_name: name.to_string(),
            policy_definition_id: "/providers/Microsoft.Authorization/policyDefinitions/x"
                .to_string(),
            scope_id: "ALZ".to_string(),
            parameters,
            description: String::new(),
            requires_identity,
            location: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_root_group_is_qualified_and_created() {
        let remote = InMemoryRemote::new();
        let outcome = converge(&root(), &ctx(), &remote).await;

        assert_eq!(outcome.identity, "Target-ALZ");
        assert_eq!(outcome.state, ApplyState::Created);
        assert!(!outcome.simulated);
        assert!(remote.has_group("Target-ALZ"));
    }

    #[tokio::test]
    async fn test_root_group_simulated() {
        let remote = InMemoryRemote::new();
        let outcome = converge(&root(), &ctx().simulated(true), &remote).await;

        assert_eq!(outcome.identity, "Target-ALZ");
        assert_eq!(outcome.state, ApplyState::WouldCreate);
        assert!(outcome.simulated);
        assert_eq!(remote.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_second_converge_is_already_exists() {
        let remote = InMemoryRemote::new();
        assert_eq!(converge(&root(), &ctx(), &remote).await.state, ApplyState::Created);
        assert_eq!(
            converge(&root(), &ctx(), &remote).await.state,
            ApplyState::AlreadyExists
        );
        assert_eq!(remote.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_not_found_error_is_absence() {
        let remote = InMemoryRemote::new().not_found_as_error(true);
        let outcome = converge(&root(), &ctx(), &remote).await;
        assert_eq!(outcome.state, ApplyState::Created);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_absence() {
        let remote = InMemoryRemote::new().fail_lookup("Target-ALZ");
        let outcome = converge(&root(), &ctx(), &remote).await;

        assert!(outcome.state.is_failure());
        assert!(outcome.message.starts_with("lookup failed for Target-ALZ"));
        assert_eq!(remote.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_declared_parent_is_qualified() {
        let remote = InMemoryRemote::new();
        let platform = DesiredResource::management_group(
            "Platform",
            "Platform",
            Some(GroupParent::Declared("ALZ".to_string())),
        )
        .unwrap();
        converge(&platform, &ctx(), &remote).await;

        assert_eq!(
            remote.calls(),
            vec![MutationCall::CreateManagementGroup {
                id: "Target-Platform".to_string(),
                display_name: "Platform".to_string(),
                parent: Some("Target-ALZ".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_prefixed_id_too_long_fails_before_remote() {
        let remote = InMemoryRemote::new();
        let long = DesiredResource::management_group("x".repeat(85), "", None).unwrap();
        let outcome = converge(&long, &ctx(), &remote).await;

        assert!(outcome.message.starts_with("invalid configuration"));
        assert_eq!(remote.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_subscription_is_skipped_in_both_modes() {
        let placement = DesiredResource::subscription_placement("", "Fabric-Prod").unwrap();
        for simulate in [false, true] {
            let remote = InMemoryRemote::new();
            let outcome = converge(&placement, &ctx().simulated(simulate), &remote).await;
            assert_eq!(
                outcome.state,
                ApplyState::Skipped("no subscription id".to_string())
            );
            assert_eq!(remote.lookup_count(), 0);
            assert_eq!(remote.mutation_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_subscription_under_other_group_is_moved() {
        let sub = "11111111-1111-1111-1111-111111111111";
        let remote = InMemoryRemote::new().with_subscription(sub, "Target-Sandbox");
        let placement = DesiredResource::subscription_placement(sub, "Fabric-Prod").unwrap();

        let outcome = converge(&placement, &ctx(), &remote).await;
        assert_eq!(outcome.state, ApplyState::Created);
        assert!(outcome.message.contains("from Target-Sandbox"));
        assert_eq!(remote.subscription_group(sub).as_deref(), Some("Target-Fabric-Prod"));

        let again = converge(&placement, &ctx(), &remote).await;
        assert_eq!(again.state, ApplyState::AlreadyExists);
    }

    #[tokio::test]
    async fn test_assignment_identity_uses_sanitized_name() {
        let remote = InMemoryRemote::new();
        let outcome = converge(
            &assignment("Require-Tag-CostCenter-Environment-LongName", false),
            &ctx(),
            &remote,
        )
        .await;

        assert_eq!(
            outcome.identity,
            "/providers/Microsoft.Management/managementGroups/Target-ALZ/providers/Microsoft.Authorization/policyAssignments/Require-Tag-CostCenter-E"
        );
        match &remote.calls()[0] {
            MutationCall::CreatePolicyAssignment(request) => {
                assert_eq!(request.name, "Require-Tag-CostCenter-E");
                assert!(request.parameters.is_some());
                assert!(!request.identity);
                assert_eq!(request.location, None);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_identity_assignment_gets_default_region() {
        let remote = InMemoryRemote::new();
        converge(&assignment("Inherit-Tag-CostCenter", true), &ctx(), &remote).await;

        match &remote.calls()[0] {
            MutationCall::CreatePolicyAssignment(request) => {
                assert!(request.identity);
                assert_eq!(request.location.as_deref(), Some("westeurope"));
                assert_eq!(request.parameters, None);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_identity_assignment_without_region_is_invalid() {
        let remote = InMemoryRemote::new();
        let ctx = ApplyContext::new("Target", "");
        let outcome = converge(&assignment("Inherit-Tag-CostCenter", true), &ctx, &remote).await;

        assert!(outcome.state.is_failure());
        assert!(outcome.identity.ends_with("/policyAssignments/Inherit-Tag-CostCenter"));
        assert_eq!(remote.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_assignment_mutation_failure_is_recorded() {
        let remote = InMemoryRemote::new().fail_mutation("Allowed-Locations");
        let outcome = converge(&assignment("Allowed-Locations", false), &ctx(), &remote).await;

        assert!(outcome.state.is_failure());
        assert!(!outcome.is_fatal());
        assert!(outcome.message.starts_with("mutation failed for /providers/"));
    }
}
