//! Management-group tree configuration.

use serde::{Deserialize, Serialize};

/// A leaf group under the platform or landing-zone branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNode {
    /// Short id; the organization prefix is added at apply time.
    pub id: String,

    /// Display name (defaults to the id).
    #[serde(default)]
    pub display_name: String,
}

impl GroupNode {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// The tenant-level root of the declared hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootGroup {
    #[serde(default = "default_root_id")]
    pub id: String,

    #[serde(default = "default_root_display_name")]
    pub display_name: String,

    /// Existing group to create the root under (unprefixed). When absent the
    /// remote API places it under the tenant root group.
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Default for RootGroup {
    fn default() -> Self {
        Self {
            id: default_root_id(),
            display_name: default_root_display_name(),
            parent_id: None,
        }
    }
}

/// An intermediate group with children (platform, landing zones).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBranch {
    pub id: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub children: Vec<GroupNode>,
}

/// Root, platform and landing-zone branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementGroupsConfig {
    #[serde(default)]
    pub root: RootGroup,

    #[serde(default = "default_platform")]
    pub platform: GroupBranch,

    #[serde(default = "default_landing_zones")]
    pub landing_zones: GroupBranch,
}

impl Default for ManagementGroupsConfig {
    fn default() -> Self {
        Self {
            root: RootGroup::default(),
            platform: default_platform(),
            landing_zones: default_landing_zones(),
        }
    }
}

impl ManagementGroupsConfig {
    /// Every declared short id, in dependency order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids = vec![self.root.id.as_str(), self.platform.id.as_str()];
        ids.extend(self.platform.children.iter().map(|c| c.id.as_str()));
        ids.push(self.landing_zones.id.as_str());
        ids.extend(self.landing_zones.children.iter().map(|c| c.id.as_str()));
        ids
    }

    pub fn contains(&self, short_id: &str) -> bool {
        self.ids().contains(&short_id)
    }
}

fn default_root_id() -> String {
    "ALZ".to_string()
}

fn default_root_display_name() -> String {
    "Azure Landing Zones".to_string()
}

fn default_platform() -> GroupBranch {
    GroupBranch {
        id: "Platform".to_string(),
        display_name: "Platform".to_string(),
        children: vec![
            GroupNode::new("Management", "Management"),
            GroupNode::new("Connectivity", "Connectivity"),
            GroupNode::new("Identity", "Identity"),
        ],
    }
}

fn default_landing_zones() -> GroupBranch {
    GroupBranch {
        id: "LandingZones".to_string(),
        display_name: "Landing Zones".to_string(),
        children: vec![
            GroupNode::new("Fabric-Prod", "Fabric Production"),
            GroupNode::new("Fabric-NonProd", "Fabric Non-Production"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ids_in_dependency_order() {
        let groups = ManagementGroupsConfig::default();
        assert_eq!(
            groups.ids(),
            vec![
                "ALZ",
                "Platform",
                "Management",
                "Connectivity",
                "Identity",
                "LandingZones",
                "Fabric-Prod",
                "Fabric-NonProd",
            ]
        );
        assert!(groups.contains("Identity"));
        assert!(!groups.contains("Sandbox"));
    }
}
