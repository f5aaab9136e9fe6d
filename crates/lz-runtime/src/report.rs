use lz_core::{ApplyOutcome, ApplyState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of one run over a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub simulated: bool,
    /// One entry per attempted declaration, in order.
    pub outcomes: Vec<ApplyOutcome>,
    /// A management group failed and the rest of the sequence was abandoned.
    pub aborted: bool,
    /// Declarations never attempted because of the abort.
    pub not_attempted: usize,
}

/// Per-state counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub exists: usize,
    pub would_create: usize,
    pub created: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_attempted: usize,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            not_attempted: self.not_attempted,
            ..Default::default()
        };
        for outcome in &self.outcomes {
            match outcome.state {
                ApplyState::AlreadyExists => summary.exists += 1,
                ApplyState::WouldCreate => summary.would_create += 1,
                ApplyState::Created => summary.created += 1,
                ApplyState::Failed(_) => summary.failed += 1,
                ApplyState::Skipped(_) => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn failures(&self) -> impl Iterator<Item = &ApplyOutcome> {
        self.outcomes.iter().filter(|o| o.state.is_failure())
    }

    /// No abort and no failed outcome.
    pub fn is_success(&self) -> bool {
        !self.aborted && self.failures().next().is_none()
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} would-create, {} exists, {} skipped, {} failed",
            self.created, self.would_create, self.exists, self.skipped, self.failed
        )?;
        if self.not_attempted > 0 {
            write!(f, ", {} not attempted", self.not_attempted)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lz_core::ResourceKind;

    fn outcome(state: ApplyState) -> ApplyOutcome {
        ApplyOutcome::new(ResourceKind::PolicyAssignment, "a", state, "")
    }

    #[test]
    fn test_summary_counts() {
        let report = RunReport {
            run_id: Uuid::new_v4(),
            simulated: false,
            outcomes: vec![
                outcome(ApplyState::Created),
                outcome(ApplyState::AlreadyExists),
                outcome(ApplyState::Skipped("no subscription id".to_string())),
                outcome(ApplyState::Failed("denied".to_string())),
            ],
            aborted: false,
            not_attempted: 0,
        };
        let summary = report.summary();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.exists, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert!(!report.is_success());
        assert_eq!(
            summary.to_string(),
            "1 created, 0 would-create, 1 exists, 1 skipped, 1 failed"
        );
    }
}
