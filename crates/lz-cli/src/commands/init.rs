//! `fabric-lz init` command implementation.
//!
//! Writes a commented sample configuration to start from.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Sample configuration. Every value shown is also the default unless noted.
pub const SAMPLE_CONFIG: &str = r#"# Fabric landing zone configuration.
#
# Management-group ids below are short ids: the organization prefix is
# joined to each of them with a hyphen (ALZ -> Fabric-ALZ).

organization:
  prefix: Fabric
  display_name: Fabric Analytics

regions:
  # Used for policy assignments that need a managed identity.
  default: westeurope
  allowed:
    - westeurope
    - northeurope

# Report what would be created without creating anything.
simulate_only: false

# Seconds to wait after creating a management group.
settle_delay_secs: 5

management_groups:
  root:
    id: ALZ
    display_name: Azure Landing Zones
    # Existing group to create the root under (used verbatim).
    # parent_id: 00000000-0000-0000-0000-000000000000
  platform:
    id: Platform
    display_name: Platform
    children:
      - { id: Management, display_name: Management }
      - { id: Connectivity, display_name: Connectivity }
      - { id: Identity, display_name: Identity }
  landing_zones:
    id: LandingZones
    display_name: Landing Zones
    children:
      - { id: Fabric-Prod, display_name: Fabric Production }
      - { id: Fabric-NonProd, display_name: Fabric Non-Production }

# Subscriptions to place under declared groups. Leave subscription_id empty
# for a slot that is not provisioned yet; it is skipped.
subscriptions:
  - subscription_id: ""
    group: Management
    description: Platform management
  - subscription_id: ""
    group: Fabric-Prod
    description: Fabric capacity (production)

policies:
  allowed_locations:
    enabled: true
  required_tags:
    enabled: true
    tags: [CostCenter, Environment]
  # Reuses the require-tag definition; see `fabric-lz check`.
  audit_tags:
    enabled: false
    tags: []
  inherit_tags:
    enabled: false
    tags: []
    scope: LandingZones
  denied_resource_types:
    enabled: false
    resource_types: []
    # effect: Deny

arm:
  endpoint: https://management.azure.com
  # Environment variable holding the bearer token.
  token_env: ARM_ACCESS_TOKEN
  timeout_secs: 60

audit:
  enabled: true
  path: lz-audit.log
  stdout: false
"#;

/// Run the `fabric-lz init` command.
pub fn run(output: &Path, force: bool) -> Result<()> {
    write_sample(output, force)?;
    println!("✅ Wrote sample configuration to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Fill in subscription ids and adjust the group tree");
    println!("  2. fabric-lz check --config {}", output.display());
    println!("  3. fabric-lz plan --config {} --offline", output.display());
    Ok(())
}

fn write_sample(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "'{}' already exists. Use --force to overwrite.",
            output.display()
        );
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(output, SAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", output.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lz_core::LandingZoneConfig;
    use tempfile::tempdir;

    #[test]
    fn test_sample_config_is_valid() {
        let config: LandingZoneConfig = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.organization.prefix, "Fabric");
        assert_eq!(config.subscriptions.len(), 2);
        assert_eq!(
            config.policies.inherit_tags.scope.as_deref(),
            Some("LandingZones")
        );
        assert_eq!(config.arm, LandingZoneConfig::default().arm);
        assert_eq!(config.audit, LandingZoneConfig::default().audit);
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("landing-zone.yaml");

        write_sample(&path, false).unwrap();
        assert!(write_sample(&path, false).is_err());
        write_sample(&path, true).unwrap();

        let loaded = LandingZoneConfig::load(&path).unwrap();
        assert_eq!(loaded.management_groups.root.id, "ALZ");
    }
}
