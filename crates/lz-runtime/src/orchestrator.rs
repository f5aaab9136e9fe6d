use lz_audit::AuditLogger;
use lz_core::{ApplyContext, ApplyOutcome, ApplyState, DesiredResource, ResourceKind};
use std::sync::Arc;
use uuid::Uuid;

use crate::adapter::Remote;
use crate::engine;
use crate::report::RunReport;

/// Runs declarations in order against one remote.
pub struct Applier<R: Remote> {
    remote: R,
    audit: Arc<AuditLogger>,
}

impl<R: Remote> Applier<R> {
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            audit: Arc::new(AuditLogger::disabled()),
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Converge a single declaration. No settling delay, no audit.
    pub async fn converge(&self, desired: &DesiredResource, ctx: &ApplyContext) -> ApplyOutcome {
        engine::converge(desired, ctx, &self.remote).await
    }

    /// Fold over the declarations in order.
    ///
    /// Stops at the first fatal outcome. Waits `ctx.settle_delay` after every
    /// created management group that is followed by another declaration.
    /// Audit failures are logged and never change the run's result.
    pub async fn run(&self, declarations: &[DesiredResource], ctx: &ApplyContext) -> RunReport {
        let run_id = Uuid::new_v4();
        let simulated = ctx.simulate_only;
        tracing::info!(
            run_id = %run_id,
            declarations = declarations.len(),
            simulated,
            prefix = %ctx.naming_prefix,
            "Starting landing zone run"
        );
        if let Err(e) = self
            .audit
            .log_run_started(run_id, simulated, declarations.len(), &ctx.naming_prefix)
            .await
        {
            tracing::warn!(error = %e, "Failed to record run start");
        }

        let mut outcomes = Vec::with_capacity(declarations.len());
        let mut aborted = false;

        for (index, desired) in declarations.iter().enumerate() {
            let outcome = engine::converge(desired, ctx, &self.remote).await;
            if let Err(e) = self.audit.log_outcome(run_id, &outcome).await {
                tracing::warn!(error = %e, resource = %outcome.identity, "Failed to record outcome");
            }

            let fatal = outcome.is_fatal();
            let settle = outcome.kind == ResourceKind::ManagementGroup
                && outcome.state == ApplyState::Created
                && index + 1 < declarations.len()
                && !ctx.settle_delay.is_zero();
            outcomes.push(outcome);

            if fatal {
                aborted = true;
                break;
            }
            if settle {
                tracing::debug!(delay = ?ctx.settle_delay, "Waiting for management group to settle");
                tokio::time::sleep(ctx.settle_delay).await;
            }
        }

        let not_attempted = declarations.len() - outcomes.len();
        if aborted {
            tracing::error!(
                run_id = %run_id,
                not_attempted,
                "Management group failed; remaining declarations were not attempted"
            );
        }
        if let Err(e) = self
            .audit
            .log_run_finished(run_id, simulated, aborted, outcomes.len(), not_attempted)
            .await
        {
            tracing::warn!(error = %e, "Failed to record run end");
        }

        let report = RunReport {
            run_id,
            simulated,
            outcomes,
            aborted,
            not_attempted,
        };
        tracing::info!(run_id = %run_id, summary = %report.summary(), "Landing zone run finished");
        report
    }
}
