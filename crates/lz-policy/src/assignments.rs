//! Turn policy categories into `PolicyAssignment` declarations.

use lz_core::config::{PoliciesConfig, RegionsConfig};
use lz_core::naming;
use lz_core::{ApplyError, DesiredResource, PolicyAssignmentSpec};
use serde_json::json;
use std::collections::BTreeMap;
use std::collections::hash_map::{Entry, HashMap};

use crate::catalog::{PolicyDefinition, PolicyKind, definition};

/// Build every enabled assignment, in a stable order: allowed locations,
/// required tags, audit tags, inherited tags, denied resource types.
///
/// `root_scope` is the short id used when a category has no explicit scope.
pub fn build_assignments(
    policies: &PoliciesConfig,
    regions: &RegionsConfig,
    root_scope: &str,
) -> Result<Vec<DesiredResource>, ApplyError> {
    let mut out = Vec::new();
    let scope_or_root = |scope: &Option<String>| scope.clone().unwrap_or_else(|| root_scope.to_string());

    if policies.allowed_locations.enabled {
        let scope = scope_or_root(&policies.allowed_locations.scope);
        let locations = json!(regions.allowed);
        out.push(assignment(
            definition(PolicyKind::AllowedLocations),
            "Allowed-Locations",
            "Allowed locations",
            &scope,
            [("listOfAllowedLocations", locations.clone())],
            "Restricts the locations resources can be deployed to.",
        )?);
        out.push(assignment(
            definition(PolicyKind::AllowedResourceGroupLocations),
            "Allowed-RG-Locations",
            "Allowed locations for resource groups",
            &scope,
            [("listOfAllowedLocations", locations)],
            "Restricts the locations resource groups can be created in.",
        )?);
    }

    let scope = scope_or_root(&policies.required_tags.scope);
    for tag in policies.required_tags.active_tags() {
        out.push(assignment(
            definition(PolicyKind::RequireTagOnResources),
            &format!("Require-Tag-{}", tag),
            &format!("Require tag '{}' on resources", tag),
            &scope,
            [("tagName", json!(tag))],
            &format!("Deny: resources must carry the '{}' tag.", tag),
        )?);
    }

    // Same definition as required tags: the remote behavior is identical and
    // only the description records the audit intent.
    let scope = scope_or_root(&policies.audit_tags.scope);
    for tag in policies.audit_tags.active_tags() {
        out.push(assignment(
            definition(PolicyKind::RequireTagOnResources),
            &format!("Audit-Tag-{}", tag),
            &format!("Audit tag '{}' on resources", tag),
            &scope,
            [("tagName", json!(tag))],
            &format!("Audit: resources should carry the '{}' tag.", tag),
        )?);
    }

    let scope = scope_or_root(&policies.inherit_tags.scope);
    for tag in policies.inherit_tags.active_tags() {
        out.push(assignment(
            definition(PolicyKind::InheritTagFromResourceGroup),
            &format!("Inherit-Tag-{}", tag),
            &format!("Inherit tag '{}' from the resource group", tag),
            &scope,
            [("tagName", json!(tag))],
            &format!("Modify: copies the '{}' tag from the resource group when missing.", tag),
        )?);
    }

    let denied = &policies.denied_resource_types;
    if denied.enabled && !denied.resource_types.is_empty() {
        let def = definition(PolicyKind::NotAllowedResourceTypes);
        let mut params = vec![("listOfResourceTypesNotAllowed", json!(denied.resource_types))];
        if let Some(effect) = denied.effect.as_deref().filter(|_| def.accepts_effect) {
            params.push(("effect", json!(effect)));
        }
        out.push(assignment(
            def,
            "Deny-Resource-Types",
            "Not allowed resource types",
            &scope_or_root(&denied.scope),
            params,
            "Blocks resource types that are not part of the workload.",
        )?);
    }

    ensure_distinct_names(&out)?;
    tracing::debug!(count = out.len(), "Built policy assignment declarations");
    Ok(out)
}

/// Two assignments whose names shorten to the same remote name at one scope
/// would be a single remote resource; the second would never be assigned.
fn ensure_distinct_names(assignments: &[DesiredResource]) -> Result<(), ApplyError> {
    let mut seen: HashMap<(String, String), &str> = HashMap::new();
    for resource in assignments {
        let DesiredResource::PolicyAssignment(spec) = resource else {
            continue;
        };
        let name = naming::sanitize_assignment_name(&spec.name);
        let key = (
            spec.scope_id.to_ascii_lowercase(),
            name.to_ascii_lowercase(),
        );
        match seen.entry(key) {
            Entry::Occupied(first) => {
                return Err(ApplyError::invalid(format!(
                    "policy assignments '{}' and '{}' both shorten to '{}' at scope '{}'",
                    first.get(),
                    spec.name,
                    name,
                    spec.scope_id
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(&spec.name);
            }
        }
    }
    Ok(())
}

/// Categories whose declared intent differs from what the remote policy
/// enforces.
pub fn advisories(policies: &PoliciesConfig) -> Vec<String> {
    let mut notes = Vec::new();
    if policies.audit_tags.active_tags().next().is_some() {
        notes.push(format!(
            "audit_tags uses the '{}' definition, which denies non-compliant resources; \
             the audit intent is only recorded in the description",
            definition(PolicyKind::RequireTagOnResources).display_name
        ));
    }
    let denied = &policies.denied_resource_types;
    if denied.enabled && denied.resource_types.is_empty() {
        notes.push("denied_resource_types is enabled but lists no resource types".to_string());
    }
    notes
}

fn assignment<'a>(
    def: &PolicyDefinition,
    name: &str,
    display_name: &str,
    scope: &str,
    parameters: impl IntoIterator<Item = (&'a str, serde_json::Value)>,
    description: &str,
) -> Result<DesiredResource, ApplyError> {
    let parameters: BTreeMap<String, serde_json::Value> = parameters
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    DesiredResource::policy_assignment(PolicyAssignmentSpec {
        name: name.to_string(),
        display_name: display_name.to_string(),
        policy_definition_id: def.resource_id(),
        scope_id: scope.to_string(),
        parameters,
        description: description.to_string(),
        requires_identity: def.requires_identity,
        location: None,
    })
}
