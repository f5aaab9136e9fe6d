//! Flat lookup table of the built-in policy definitions the landing zone
//! assigns.

use serde::{Deserialize, Serialize};
use std::fmt;

const DEFINITION_PATH: &str = "/providers/Microsoft.Authorization/policyDefinitions/";

/// Built-in policy definitions known to the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    AllowedLocations,
    AllowedResourceGroupLocations,
    RequireTagOnResources,
    InheritTagFromResourceGroup,
    NotAllowedResourceTypes,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(definition(*self).display_name)
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDefinition {
    pub kind: PolicyKind,
    /// Built-in definition name (a GUID).
    pub name: &'static str,
    pub display_name: &'static str,
    /// Modify/DeployIfNotExists definitions need a managed identity on the
    /// assignment.
    pub requires_identity: bool,
    /// Whether the definition exposes an `effect` parameter.
    pub accepts_effect: bool,
}

impl PolicyDefinition {
    /// Full ARM resource id of the definition.
    pub fn resource_id(&self) -> String {
        format!("{}{}", DEFINITION_PATH, self.name)
    }
}

pub const ALLOWED_LOCATIONS: PolicyDefinition = PolicyDefinition {
    kind: PolicyKind::AllowedLocations,
    name: "e56962a6-4747-49cd-b67b-bf8b01975c4c",
    display_name: "Allowed locations",
    requires_identity: false,
    accepts_effect: false,
};

pub const ALLOWED_RESOURCE_GROUP_LOCATIONS: PolicyDefinition = PolicyDefinition {
    kind: PolicyKind::AllowedResourceGroupLocations,
    name: "e765b5de-1225-4ba3-bd56-1ac6695af988",
    display_name: "Allowed locations for resource groups",
    requires_identity: false,
    accepts_effect: false,
};

pub const REQUIRE_TAG_ON_RESOURCES: PolicyDefinition = PolicyDefinition {
    kind: PolicyKind::RequireTagOnResources,
    name: "871b6d14-10aa-478d-b590-94f262ecfa99",
    display_name: "Require a tag on resources",
    requires_identity: false,
    accepts_effect: false,
};

pub const INHERIT_TAG_FROM_RESOURCE_GROUP: PolicyDefinition = PolicyDefinition {
    kind: PolicyKind::InheritTagFromResourceGroup,
    name: "ea3f2387-9b95-492a-a190-fcdc54f7b070",
    display_name: "Inherit a tag from the resource group if missing",
    requires_identity: true,
    accepts_effect: false,
};

pub const NOT_ALLOWED_RESOURCE_TYPES: PolicyDefinition = PolicyDefinition {
    kind: PolicyKind::NotAllowedResourceTypes,
    name: "6c112d4e-5bc7-47ae-a041-ea2d9dccd749",
    display_name: "Not allowed resource types",
    requires_identity: false,
    accepts_effect: true,
};

pub const CATALOG: &[PolicyDefinition] = &[
    ALLOWED_LOCATIONS,
    ALLOWED_RESOURCE_GROUP_LOCATIONS,
    REQUIRE_TAG_ON_RESOURCES,
    INHERIT_TAG_FROM_RESOURCE_GROUP,
    NOT_ALLOWED_RESOURCE_TYPES,
];

/// Look up the catalog entry for a kind.
pub fn definition(kind: PolicyKind) -> &'static PolicyDefinition {
    match kind {
        PolicyKind::AllowedLocations => &ALLOWED_LOCATIONS,
        PolicyKind::AllowedResourceGroupLocations => &ALLOWED_RESOURCE_GROUP_LOCATIONS,
        PolicyKind::RequireTagOnResources => &REQUIRE_TAG_ON_RESOURCES,
        PolicyKind::InheritTagFromResourceGroup => &INHERIT_TAG_FROM_RESOURCE_GROUP,
        PolicyKind::NotAllowedResourceTypes => &NOT_ALLOWED_RESOURCE_TYPES,
    }
}

/// Reverse lookup by definition resource id (case-insensitive, as ARM ids are).
pub fn find_by_resource_id(resource_id: &str) -> Option<&'static PolicyDefinition> {
    let name = lz_core::naming::resource_name(resource_id);
    CATALOG.iter().find(|d| d.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL: [PolicyKind; 5] = [
        PolicyKind::AllowedLocations,
        PolicyKind::AllowedResourceGroupLocations,
        PolicyKind::RequireTagOnResources,
        PolicyKind::InheritTagFromResourceGroup,
        PolicyKind::NotAllowedResourceTypes,
    ];

    #[test]
    fn test_every_kind_has_its_own_entry() {
        for kind in ALL {
            assert_eq!(definition(kind).kind, kind);
        }
        let names: HashSet<_> = CATALOG.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_resource_id_roundtrip() {
        let def = definition(PolicyKind::RequireTagOnResources);
        let id = def.resource_id();
        assert_eq!(
            id,
            "/providers/Microsoft.Authorization/policyDefinitions/871b6d14-10aa-478d-b590-94f262ecfa99"
        );
        assert_eq!(find_by_resource_id(&id.to_uppercase()).map(|d| d.kind), Some(def.kind));
        assert!(find_by_resource_id("/providers/x/policyDefinitions/unknown").is_none());
    }

    #[test]
    fn test_only_modify_policy_needs_identity() {
        let with_identity: Vec<_> = CATALOG
            .iter()
            .filter(|d| d.requires_identity)
            .map(|d| d.kind)
            .collect();
        assert_eq!(with_identity, vec![PolicyKind::InheritTagFromResourceGroup]);
    }
}
