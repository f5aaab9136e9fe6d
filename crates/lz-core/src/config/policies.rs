//! Policy category configuration.
//!
//! Each category is switched on independently and scoped to one declared
//! management group (the root group when `scope` is omitted).

use serde::{Deserialize, Serialize};

/// Restrict resources and resource groups to the allowed regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedLocationsPolicy {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub scope: Option<String>,
}

impl Default for AllowedLocationsPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            scope: None,
        }
    }
}

/// A tag-based category: one assignment per tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPolicy {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub scope: Option<String>,
}

impl TagPolicy {
    pub fn enabled_with(tags: &[&str]) -> Self {
        Self {
            enabled: true,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            scope: None,
        }
    }

    /// Tags that should produce an assignment (enabled, non-blank).
    pub fn active_tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| self.enabled && !t.is_empty())
    }
}

/// Block resource types that have no place in the workload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeniedResourceTypesPolicy {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub resource_types: Vec<String>,

    /// Passed through as the `effect` parameter when set (e.g. `Deny`,
    /// `Audit`). The remote API rejects values the definition does not allow.
    #[serde(default)]
    pub effect: Option<String>,

    #[serde(default)]
    pub scope: Option<String>,
}

/// All policy categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoliciesConfig {
    #[serde(default)]
    pub allowed_locations: AllowedLocationsPolicy,

    /// Deny resources missing any of these tags.
    #[serde(default = "default_required_tags")]
    pub required_tags: TagPolicy,

    /// Intended as audit-only tag checks.
    #[serde(default)]
    pub audit_tags: TagPolicy,

    /// Copy these tags from the resource group when missing. Needs a managed
    /// identity on the assignment.
    #[serde(default)]
    pub inherit_tags: TagPolicy,

    #[serde(default)]
    pub denied_resource_types: DeniedResourceTypesPolicy,
}

impl Default for PoliciesConfig {
    fn default() -> Self {
        Self {
            allowed_locations: AllowedLocationsPolicy::default(),
            required_tags: default_required_tags(),
            audit_tags: TagPolicy::default(),
            inherit_tags: TagPolicy::default(),
            denied_resource_types: DeniedResourceTypesPolicy::default(),
        }
    }
}

impl PoliciesConfig {
    /// Configured scopes with their config location, for reference checks.
    pub fn scopes(&self) -> Vec<(&'static str, &str)> {
        [
            ("policies.allowed_locations.scope", &self.allowed_locations.scope),
            ("policies.required_tags.scope", &self.required_tags.scope),
            ("policies.audit_tags.scope", &self.audit_tags.scope),
            ("policies.inherit_tags.scope", &self.inherit_tags.scope),
            (
                "policies.denied_resource_types.scope",
                &self.denied_resource_types.scope,
            ),
        ]
        .into_iter()
        .filter_map(|(location, scope)| scope.as_deref().map(|s| (location, s)))
        .collect()
    }
}

fn default_true() -> bool {
    true
}

fn default_required_tags() -> TagPolicy {
    TagPolicy::enabled_with(&["CostCenter", "Environment"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_tags_respects_enabled_flag() {
        let mut tags = TagPolicy::enabled_with(&["Owner", " ", "CostCenter "]);
        assert_eq!(tags.active_tags().collect::<Vec<_>>(), vec!["Owner", "CostCenter"]);

        tags.enabled = false;
        assert_eq!(tags.active_tags().count(), 0);
    }

    #[test]
    fn test_scopes_only_lists_configured() {
        let mut policies = PoliciesConfig::default();
        assert!(policies.scopes().is_empty());

        policies.inherit_tags.scope = Some("LandingZones".to_string());
        assert_eq!(
            policies.scopes(),
            vec![("policies.inherit_tags.scope", "LandingZones")]
        );
    }
}
