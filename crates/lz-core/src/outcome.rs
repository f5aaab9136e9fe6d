//! Results of converging a single declaration.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ApplyError;
use crate::resource::ResourceKind;

/// Terminal state of one declaration. A declaration reaches exactly one of
/// these per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ApplyState {
    AlreadyExists,
    /// Simulate mode only.
    WouldCreate,
    Created,
    Failed(String),
    Skipped(String),
}

impl ApplyState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "exists",
            Self::WouldCreate => "would-create",
            Self::Created => "created",
            Self::Failed(_) => "failed",
            Self::Skipped(_) => "skipped",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ApplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) | Self::Skipped(reason) => {
                write!(f, "{} ({})", self.label(), reason)
            }
            _ => write!(f, "{}", self.label()),
        }
    }
}

/// Structured outcome record for one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub kind: ResourceKind,
    /// Fully-qualified identity that was checked or created.
    pub identity: String,
    pub state: ApplyState,
    pub message: String,
    /// Whether the run was in simulate mode.
    #[serde(default)]
    pub simulated: bool,
}

impl ApplyOutcome {
    pub fn new(
        kind: ResourceKind,
        identity: impl Into<String>,
        state: ApplyState,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            identity: identity.into(),
            state,
            message: message.into(),
            simulated: false,
        }
    }

    pub fn failed(kind: ResourceKind, identity: impl Into<String>, error: &ApplyError) -> Self {
        let reason = error.to_string();
        Self::new(kind, identity, ApplyState::Failed(reason.clone()), reason)
    }

    pub fn in_simulation(mut self, simulated: bool) -> Self {
        self.simulated = simulated;
        self
    }

    /// Whether the remaining sequence must be abandoned.
    ///
    /// Every later declaration assumes the group hierarchy exists, so only
    /// management-group failures escalate; placement and policy failures are
    /// independent of each other.
    pub fn is_fatal(&self) -> bool {
        self.state.is_failure() && self.kind == ResourceKind::ManagementGroup
    }

    /// One-line, human-readable rendering. Simulated outcomes are tagged so
    /// they can't be mistaken for real mutations.
    pub fn to_log_line(&self) -> String {
        let tag = if self.simulated { "[simulate] " } else { "" };
        format!(
            "{}{:<22} {:<13} {} :: {}",
            tag,
            self.kind,
            self.state.label(),
            self.identity,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_group_failures_are_fatal() {
        let err = ApplyError::mutation_failed("Target-ALZ", "403 Forbidden");
        assert!(ApplyOutcome::failed(ResourceKind::ManagementGroup, "Target-ALZ", &err).is_fatal());
        assert!(!ApplyOutcome::failed(ResourceKind::PolicyAssignment, "x", &err).is_fatal());
        assert!(!ApplyOutcome::failed(ResourceKind::SubscriptionPlacement, "x", &err).is_fatal());
        assert!(
            !ApplyOutcome::new(ResourceKind::ManagementGroup, "g", ApplyState::Created, "ok")
                .is_fatal()
        );
    }

    #[test]
    fn test_log_line_marks_simulation() {
        let outcome = ApplyOutcome::new(
            ResourceKind::ManagementGroup,
            "Target-ALZ",
            ApplyState::WouldCreate,
            "would create management group",
        )
        .in_simulation(true);
        let line = outcome.to_log_line();
        assert!(line.starts_with("[simulate] "));
        assert!(line.contains("would-create"));
        assert!(line.contains("Target-ALZ"));
    }

    #[test]
    fn test_serializes_tagged_state() {
        let outcome = ApplyOutcome::new(
            ResourceKind::SubscriptionPlacement,
            "",
            ApplyState::Skipped("no subscription id".to_string()),
            "no subscription id",
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["state"]["status"], "skipped");
        assert_eq!(json["state"]["reason"], "no subscription id");
        assert_eq!(json["kind"], "subscription_placement");
    }
}
