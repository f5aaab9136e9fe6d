//! `fabric-lz plan` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use lz_core::{ApplyContext, DesiredResource, LandingZoneConfig, ResourceKind};
use lz_planner::{Plan, PlanStage};
use lz_runtime::{Applier, InMemoryRemote, qualified_identity};

use super::{apply, check};

#[derive(Debug, Serialize)]
struct PlanEntry {
    stage: PlanStage,
    kind: ResourceKind,
    identity: String,
    label: String,
    /// Display name of the built-in policy definition, for assignments.
    #[serde(skip_serializing_if = "Option::is_none")]
    definition: Option<&'static str>,
}

fn definition_name(resource: &DesiredResource) -> Option<&'static str> {
    match resource {
        DesiredResource::PolicyAssignment(spec) => {
            lz_policy::find_by_resource_id(&spec.policy_definition_id).map(|d| d.display_name)
        }
        _ => None,
    }
}

fn entries(plan: &Plan, ctx: &ApplyContext) -> Vec<PlanEntry> {
    plan.steps
        .iter()
        .map(|step| PlanEntry {
            stage: step.stage,
            kind: step.resource.kind(),
            identity: qualified_identity(&step.resource, ctx),
            label: step.resource.label(),
            definition: definition_name(&step.resource),
        })
        .collect()
}

fn print_plan(entries: &[PlanEntry], simulated: bool) {
    let mode = if simulated { " (simulate only)" } else { "" };
    println!("📋 Plan: {} declaration(s){}", entries.len(), mode);

    let mut stage = None;
    for entry in entries {
        if stage != Some(entry.stage) {
            println!("\n  {}", entry.stage);
            stage = Some(entry.stage);
        }
        println!("    • {:<22} {}", entry.kind, entry.identity);
        if entry.label != entry.identity {
            println!("      {:<22} {}", "", entry.label);
        }
        if let Some(definition) = entry.definition {
            println!("      {:<22} policy: {}", "", definition);
        }
    }
    println!();
}

/// Run the `fabric-lz plan` command.
///
/// With `offline`, the plan is also run in simulate mode against an empty
/// in-memory tenant, showing what a first apply would create.
pub async fn run(config_path: &Path, offline: bool, json: bool) -> Result<()> {
    check::run_pre_hook(config_path)?;

    let config = LandingZoneConfig::load(config_path).context("Failed to load configuration")?;
    let plan = lz_planner::plan(&config).context("Failed to plan landing zone")?;
    let ctx = config.apply_context(false);

    if !offline {
        let entries = entries(&plan, &ctx);
        if json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        } else {
            print_plan(&entries, ctx.simulate_only);
        }
        return Ok(());
    }

    let ctx = ctx.simulated(true).with_settle_delay(Duration::ZERO);
    let declarations = plan.into_declarations();
    let report = Applier::new(InMemoryRemote::new())
        .run(&declarations, &ctx)
        .await;
    apply::print_report(&report, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lz_core::config::SubscriptionPlacementConfig;

    #[test]
    fn test_entries_use_qualified_identities() {
        let mut config = LandingZoneConfig::default();
        config.organization.prefix = "Contoso".to_string();
        config.subscriptions = vec![SubscriptionPlacementConfig {
            subscription_id: "11111111-1111-1111-1111-111111111111".to_string(),
            group: "Management".to_string(),
            description: None,
        }];

        let plan = lz_planner::plan(&config).unwrap();
        let entries = entries(&plan, &config.apply_context(false));

        assert_eq!(entries.len(), plan.len());
        assert_eq!(entries[0].stage, PlanStage::RootGroup);
        assert_eq!(entries[0].identity, "Contoso-ALZ");
        let placement = entries
            .iter()
            .find(|e| e.kind == ResourceKind::SubscriptionPlacement)
            .unwrap();
        assert_eq!(placement.identity, "11111111-1111-1111-1111-111111111111");
        let assignment = entries.last().unwrap();
        assert_eq!(assignment.kind, ResourceKind::PolicyAssignment);
        assert!(
            assignment
                .identity
                .starts_with("/providers/Microsoft.Management/managementGroups/Contoso-ALZ/")
        );
        assert_eq!(
            assignment.definition,
            Some(
                lz_policy::definition(lz_policy::PolicyKind::RequireTagOnResources).display_name
            )
        );
        assert!(
            entries
                .iter()
                .filter(|e| e.kind != ResourceKind::PolicyAssignment)
                .all(|e| e.definition.is_none())
        );
    }
}
