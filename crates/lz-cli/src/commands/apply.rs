//! `fabric-lz apply` command implementation.
//!
//! Converges the landing zone against Azure Resource Manager. With
//! `--simulate` (or `simulate_only: true` in the file) nothing is created;
//! lookups still run, so the report shows what exists today.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use lz_adapter_arm::ArmClient;
use lz_audit::AuditLogger;
use lz_core::LandingZoneConfig;
use lz_runtime::{Applier, RunReport};

use super::check;

/// Options for `fabric-lz apply`.
#[derive(Debug, Default)]
pub struct ApplyOptions {
    pub simulate: bool,
    /// Bearer token; falls back to the variable named by `arm.token_env`.
    pub token: Option<String>,
    /// Overrides `arm.endpoint`.
    pub endpoint: Option<String>,
    pub json: bool,
}

/// Run the `fabric-lz apply` command.
pub async fn run(config_path: &Path, options: ApplyOptions) -> Result<()> {
    check::run_pre_hook(config_path)?;

    let mut config =
        LandingZoneConfig::load(config_path).context("Failed to load configuration")?;
    if let Some(endpoint) = options.endpoint {
        config.arm.endpoint = endpoint;
    }

    let plan = lz_planner::plan(&config).context("Failed to plan landing zone")?;
    let ctx = config.apply_context(options.simulate);

    let client = ArmClient::from_config(&config.arm, options.token)
        .context("Failed to create Azure Resource Manager client")?;
    let audit = AuditLogger::new(config.audit.clone()).context("Failed to open audit log")?;

    tracing::info!(
        endpoint = %client.endpoint(),
        prefix = %ctx.naming_prefix,
        simulate = ctx.simulate_only,
        declarations = plan.len(),
        "Applying landing zone"
    );

    let applier = Applier::new(client).with_audit(Arc::new(audit));
    let declarations = plan.into_declarations();
    let report = applier.run(&declarations, &ctx).await;

    print_report(&report, options.json)
}

/// Print a run report and fail if any declaration failed.
pub fn print_report(report: &RunReport, json: bool) -> Result<()> {
    let summary = report.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for outcome in &report.outcomes {
            println!("{}", outcome.to_log_line());
        }
        println!();
        if report.aborted {
            println!(
                "⛔ Run aborted after a management group failure; {} declaration(s) not attempted",
                report.not_attempted
            );
        }
        let icon = if report.is_success() { "✅" } else { "❌" };
        let mode = if report.simulated { " (simulated)" } else { "" };
        println!("{} {}{}", icon, summary, mode);
    }

    if !report.is_success() {
        anyhow::bail!("{} declaration(s) failed", summary.failed);
    }
    Ok(())
}
