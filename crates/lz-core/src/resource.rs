//! Declarations of what should exist remotely.
//!
//! A [`DesiredResource`] is built fresh from configuration for every run and
//! owns nothing remote. Group ids, parents and scopes are short ids; the
//! engine qualifies them with the run's naming prefix.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ApplyError;
use crate::naming;

/// Kind of remote resource a declaration describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ManagementGroup,
    SubscriptionPlacement,
    PolicyAssignment,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::ManagementGroup => "management_group",
            Self::SubscriptionPlacement => "subscription_placement",
            Self::PolicyAssignment => "policy_assignment",
        })
    }
}

/// Parent of a management group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum GroupParent {
    /// Another group declared in the same plan (short id, gets prefixed).
    Declared(String),
    /// A group that already exists outside the plan (used verbatim).
    Existing(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementGroupSpec {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<GroupParent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlacementSpec {
    /// May be empty when the configuration leaves a slot unfilled; the engine
    /// skips such placements.
    pub subscription_id: String,
    pub target_group_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyAssignmentSpec {
    /// Unsanitized name; see [`naming::sanitize_assignment_name`].
    pub name: String,
    pub display_name: String,
    pub policy_definition_id: String,
    /// Short id of the management group the assignment is scoped to.
    pub scope_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires_identity: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// One thing that should exist remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DesiredResource {
    ManagementGroup(ManagementGroupSpec),
    SubscriptionPlacement(SubscriptionPlacementSpec),
    PolicyAssignment(PolicyAssignmentSpec),
}

impl DesiredResource {
    /// Declare a management group, validating the short id.
    pub fn management_group(
        id: impl Into<String>,
        display_name: impl Into<String>,
        parent: Option<GroupParent>,
    ) -> Result<Self, ApplyError> {
        let id = id.into();
        naming::validate_group_id(&id)?;
        if let Some(GroupParent::Declared(parent_id) | GroupParent::Existing(parent_id)) = &parent
        {
            naming::validate_group_id(parent_id)?;
        }
        let display_name = display_name.into();
        Ok(Self::ManagementGroup(ManagementGroupSpec {
            display_name: if display_name.is_empty() {
                id.clone()
            } else {
                display_name
            },
            id,
            parent,
        }))
    }

    /// Declare a subscription placement. An empty subscription id is accepted
    /// and later converges to `Skipped`.
    pub fn subscription_placement(
        subscription_id: impl Into<String>,
        target_group_id: impl Into<String>,
    ) -> Result<Self, ApplyError> {
        let target_group_id = target_group_id.into();
        naming::validate_group_id(&target_group_id)?;
        Ok(Self::SubscriptionPlacement(SubscriptionPlacementSpec {
            subscription_id: subscription_id.into().trim().to_string(),
            target_group_id,
        }))
    }

    /// Declare a policy assignment, rejecting names that sanitize to nothing.
    pub fn policy_assignment(spec: PolicyAssignmentSpec) -> Result<Self, ApplyError> {
        naming::assignment_name(&spec.name)?;
        naming::validate_group_id(&spec.scope_id)?;
        if spec.policy_definition_id.trim().is_empty() {
            return Err(ApplyError::invalid(format!(
                "policy assignment '{}' has no policy definition id",
                spec.name
            )));
        }
        Ok(Self::PolicyAssignment(spec))
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::ManagementGroup(_) => ResourceKind::ManagementGroup,
            Self::SubscriptionPlacement(_) => ResourceKind::SubscriptionPlacement,
            Self::PolicyAssignment(_) => ResourceKind::PolicyAssignment,
        }
    }

    /// Short, unqualified label for logs and plan listings.
    pub fn label(&self) -> String {
        match self {
            Self::ManagementGroup(g) => g.id.clone(),
            Self::SubscriptionPlacement(p) => {
                format!("{} -> {}", display_subscription(&p.subscription_id), p.target_group_id)
            }
            Self::PolicyAssignment(a) => format!("{} @ {}", a.name, a.scope_id),
        }
    }
}

fn display_subscription(id: &str) -> &str {
    if id.is_empty() { "<unset>" } else { id }
}
