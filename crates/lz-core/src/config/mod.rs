//! Configuration types for the landing-zone provisioner.
//!
//! A single YAML file (`landing-zone.yaml` by convention) describes the
//! organization prefix, regions, the management-group tree, subscription
//! placements and the policy categories to assign.
//!
//! # Configuration File
//!
//! ```yaml
//! organization:
//!   prefix: Contoso
//! regions:
//!   default: westeurope
//!   allowed: [westeurope, northeurope]
//! management_groups:
//!   root: { id: ALZ, display_name: Azure Landing Zones }
//! subscriptions:
//!   - subscription_id: 00000000-0000-0000-0000-000000000000
//!     group: Management
//! policies:
//!   required_tags: { enabled: true, tags: [CostCenter] }
//! ```

pub mod arm;
pub mod audit;
pub mod groups;
pub mod policies;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub use arm::ArmConfig;
pub use audit::AuditConfig;
pub use groups::{GroupBranch, GroupNode, ManagementGroupsConfig, RootGroup};
pub use policies::{AllowedLocationsPolicy, DeniedResourceTypesPolicy, PoliciesConfig, TagPolicy};

use crate::context::{ApplyContext, DEFAULT_SETTLE_DELAY};
use crate::error::ConfigError;
use crate::naming;

/// Complete landing-zone configuration loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingZoneConfig {
    #[serde(default)]
    pub organization: OrganizationConfig,

    #[serde(default)]
    pub regions: RegionsConfig,

    /// Report what would be created without creating anything.
    #[serde(default)]
    pub simulate_only: bool,

    /// Wait after each management-group creation, in seconds.
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,

    #[serde(default)]
    pub management_groups: ManagementGroupsConfig,

    /// Subscriptions to place under declared groups.
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionPlacementConfig>,

    #[serde(default)]
    pub policies: PoliciesConfig,

    #[serde(default)]
    pub arm: ArmConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for LandingZoneConfig {
    fn default() -> Self {
        Self {
            organization: OrganizationConfig::default(),
            regions: RegionsConfig::default(),
            simulate_only: false,
            settle_delay_secs: default_settle_delay_secs(),
            management_groups: ManagementGroupsConfig::default(),
            subscriptions: Vec::new(),
            policies: PoliciesConfig::default(),
            arm: ArmConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationConfig {
    /// Joined to every management-group id with a hyphen.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default)]
    pub display_name: Option<String>,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            display_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionsConfig {
    /// Region for identity-bearing policy assignments.
    #[serde(default = "default_region")]
    pub default: String,

    /// Regions permitted by the allowed-locations policies.
    #[serde(default = "default_allowed_regions")]
    pub allowed: Vec<String>,
}

impl Default for RegionsConfig {
    fn default() -> Self {
        Self {
            default: default_region(),
            allowed: default_allowed_regions(),
        }
    }
}

/// One subscription and the declared group it belongs under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlacementConfig {
    /// May be left empty for a slot not yet provisioned.
    #[serde(default)]
    pub subscription_id: String,

    /// Short id of the target management group.
    pub group: String,

    #[serde(default)]
    pub description: Option<String>,
}

impl LandingZoneConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Serialize to YAML (used by `init`).
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Structural checks that must pass before any remote call.
    ///
    /// Returns every problem found rather than stopping at the first one.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.organization.prefix.trim().is_empty() {
            errors.push(ConfigError::EmptyPrefix);
        }

        let mut seen = HashSet::new();
        for id in self.management_groups.ids() {
            if !seen.insert(id) {
                errors.push(ConfigError::DuplicateGroup(id.to_string()));
            }
            let qualified = naming::qualify_group_id(&self.organization.prefix, id);
            if let Err(e) = naming::validate_group_id(&qualified) {
                errors.push(ConfigError::InvalidIdentifier {
                    location: format!("management_groups.{}", id),
                    reason: e.to_string(),
                });
            }
        }

        if let Some(parent) = &self.management_groups.root.parent_id {
            if let Err(e) = naming::validate_group_id(parent) {
                errors.push(ConfigError::InvalidIdentifier {
                    location: "management_groups.root.parent_id".to_string(),
                    reason: e.to_string(),
                });
            }
        }

        for (i, placement) in self.subscriptions.iter().enumerate() {
            if !self.management_groups.contains(&placement.group) {
                errors.push(ConfigError::UnknownGroup {
                    location: format!("subscriptions[{}].group", i),
                    group: placement.group.clone(),
                });
            }
        }

        for (location, scope) in self.policies.scopes() {
            if !self.management_groups.contains(scope) {
                errors.push(ConfigError::UnknownGroup {
                    location: location.to_string(),
                    group: scope.to_string(),
                });
            }
        }

        if self.policies.allowed_locations.enabled && self.regions.allowed.is_empty() {
            errors.push(ConfigError::NoAllowedRegions);
        }

        errors
    }

    /// Build the run context. `simulate` forces simulate-only mode on top of
    /// the file setting.
    pub fn apply_context(&self, simulate: bool) -> ApplyContext {
        ApplyContext::new(
            self.organization.prefix.trim(),
            self.regions.default.clone(),
        )
        .simulated(self.simulate_only || simulate)
        .with_settle_delay(Duration::from_secs(self.settle_delay_secs))
    }
}

fn default_prefix() -> String {
    "Fabric".to_string()
}

fn default_region() -> String {
    "westeurope".to_string()
}

fn default_allowed_regions() -> Vec<String> {
    vec!["westeurope".to_string(), "northeurope".to_string()]
}

fn default_settle_delay_secs() -> u64 {
    DEFAULT_SETTLE_DELAY.as_secs()
}
