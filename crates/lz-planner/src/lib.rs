//! Planning step: configuration in, ordered declarations out.
//!
//! The order is a hard requirement, not an optimization: every later stage
//! assumes the groups declared by earlier stages exist.

use lz_core::config::{GroupBranch, LandingZoneConfig};
use lz_core::{ApplyError, DesiredResource, GroupParent, ResourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dependency stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStage {
    RootGroup,
    PlatformGroup,
    PlatformChildren,
    LandingZoneGroup,
    LandingZoneChildren,
    SubscriptionPlacements,
    PolicyAssignments,
}

impl fmt::Display for PlanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::RootGroup => "root group",
            Self::PlatformGroup => "platform group",
            Self::PlatformChildren => "platform children",
            Self::LandingZoneGroup => "landing-zone group",
            Self::LandingZoneChildren => "landing-zone children",
            Self::SubscriptionPlacements => "subscription placements",
            Self::PolicyAssignments => "policy assignments",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub stage: PlanStage,
    pub resource: DesiredResource,
}

/// Ordered declarations for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlannedStep>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Declarations in execution order.
    pub fn declarations(&self) -> impl Iterator<Item = &DesiredResource> {
        self.steps.iter().map(|s| &s.resource)
    }

    pub fn into_declarations(self) -> Vec<DesiredResource> {
        self.steps.into_iter().map(|s| s.resource).collect()
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.declarations().filter(|r| r.kind() == kind).count()
    }

    fn push(&mut self, stage: PlanStage, resource: DesiredResource) {
        self.steps.push(PlannedStep { stage, resource });
    }
}

/// Build the plan for a configuration.
///
/// Fails with `InvalidConfiguration` if any declaration is malformed; nothing
/// remote has been touched at that point.
pub fn plan(config: &LandingZoneConfig) -> Result<Plan, ApplyError> {
    let groups = &config.management_groups;
    let mut plan = Plan::default();

    let root = &groups.root;
    plan.push(
        PlanStage::RootGroup,
        DesiredResource::management_group(
            &root.id,
            &root.display_name,
            root.parent_id.clone().map(GroupParent::Existing),
        )?,
    );

    push_branch(
        &mut plan,
        &groups.platform,
        &root.id,
        PlanStage::PlatformGroup,
        PlanStage::PlatformChildren,
    )?;
    push_branch(
        &mut plan,
        &groups.landing_zones,
        &root.id,
        PlanStage::LandingZoneGroup,
        PlanStage::LandingZoneChildren,
    )?;

    for placement in &config.subscriptions {
        plan.push(
            PlanStage::SubscriptionPlacements,
            DesiredResource::subscription_placement(&placement.subscription_id, &placement.group)?,
        );
    }

    for assignment in lz_policy::build_assignments(&config.policies, &config.regions, &root.id)? {
        plan.push(PlanStage::PolicyAssignments, assignment);
    }

    tracing::debug!(
        steps = plan.len(),
        groups = plan.count(ResourceKind::ManagementGroup),
        placements = plan.count(ResourceKind::SubscriptionPlacement),
        assignments = plan.count(ResourceKind::PolicyAssignment),
        "Planned landing zone"
    );

    Ok(plan)
}

fn push_branch(
    plan: &mut Plan,
    branch: &GroupBranch,
    root_id: &str,
    group_stage: PlanStage,
    children_stage: PlanStage,
) -> Result<(), ApplyError> {
    plan.push(
        group_stage,
        DesiredResource::management_group(
            &branch.id,
            &branch.display_name,
            Some(GroupParent::Declared(root_id.to_string())),
        )?,
    );
    for child in &branch.children {
        plan.push(
            children_stage,
            DesiredResource::management_group(
                &child.id,
                &child.display_name,
                Some(GroupParent::Declared(branch.id.clone())),
            )?,
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lz_core::config::SubscriptionPlacementConfig;

    fn config() -> LandingZoneConfig {
        let mut config = LandingZoneConfig::default();
        config.subscriptions = vec![
            SubscriptionPlacementConfig {
                subscription_id: "11111111-1111-1111-1111-111111111111".to_string(),
                group: "Management".to_string(),
                description: None,
            },
            SubscriptionPlacementConfig {
                subscription_id: String::new(),
                group: "Fabric-Prod".to_string(),
                description: None,
            },
        ];
        config
    }

    #[test]
    fn test_stages_are_in_dependency_order() {
        let plan = plan(&config()).unwrap();
        let stages: Vec<_> = plan.steps.iter().map(|s| s.stage).collect();
        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted);
        assert_eq!(stages.first(), Some(&PlanStage::RootGroup));
        assert_eq!(stages.last(), Some(&PlanStage::PolicyAssignments));
    }

    #[test]
    fn test_counts() {
        let plan = plan(&config()).unwrap();
        assert_eq!(plan.count(ResourceKind::ManagementGroup), 8);
        assert_eq!(plan.count(ResourceKind::SubscriptionPlacement), 2);
        assert_eq!(plan.count(ResourceKind::PolicyAssignment), 4);
        assert_eq!(plan.len(), 14);
    }

    #[test]
    fn test_parents_follow_the_tree() {
        let plan = plan(&config()).unwrap();
        let parents: Vec<(String, Option<GroupParent>)> = plan
            .declarations()
            .filter_map(|r| match r {
                DesiredResource::ManagementGroup(g) => Some((g.id.clone(), g.parent.clone())),
                _ => None,
            })
            .collect();

        assert_eq!(parents[0], ("ALZ".to_string(), None));
        assert_eq!(
            parents[1],
            ("Platform".to_string(), Some(GroupParent::Declared("ALZ".to_string())))
        );
        assert_eq!(
            parents[2],
            (
                "Management".to_string(),
                Some(GroupParent::Declared("Platform".to_string()))
            )
        );
        let fabric_prod = parents.iter().find(|(id, _)| id == "Fabric-Prod").unwrap();
        assert_eq!(
            fabric_prod.1,
            Some(GroupParent::Declared("LandingZones".to_string()))
        );
    }

    #[test]
    fn test_root_parent_is_existing_group() {
        let mut config = config();
        config.management_groups.root.parent_id = Some("tenant-root".to_string());
        let plan = plan(&config).unwrap();
        match plan.declarations().next() {
            Some(DesiredResource::ManagementGroup(g)) => {
                assert_eq!(g.parent, Some(GroupParent::Existing("tenant-root".to_string())))
            }
            other => panic!("unexpected first declaration {other:?}"),
        }
    }

    #[test]
    fn test_colliding_assignment_names_fail_planning() {
        let mut config = config();
        config.policies.required_tags.tags =
            vec!["ApplicationOwner".to_string(), "ApplicationOwnerEmail".to_string()];
        assert!(matches!(
            plan(&config),
            Err(ApplyError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_invalid_group_fails_planning() {
        let mut config = config();
        config.management_groups.platform.children[0].id = "not valid!".to_string();
        assert!(matches!(
            plan(&config),
            Err(ApplyError::InvalidConfiguration(_))
        ));
    }
}
