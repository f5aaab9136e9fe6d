//! `fabric-lz check` command implementation.
//!
//! Validates a landing-zone configuration without contacting Azure:
//! - Structural validation (prefix, identifiers, group references)
//! - Planning (every declaration must be well-formed)
//! - Warnings for settings that are accepted but probably not intended

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use lz_core::LandingZoneConfig;

// ============================================================================
// Check Result Types
// ============================================================================

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Category of the check that produced this finding.
    pub category: String,
    pub message: String,
    /// Optional location within the file (e.g. "subscriptions[0].group").
    pub location: Option<String>,
}

impl CheckFinding {
    fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            location: None,
        }
    }

    fn error(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message)
    }

    fn warning(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, message)
    }

    fn info(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, category, message)
    }

    fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    fn add(&mut self, finding: CheckFinding) {
        self.findings.push(finding);
    }

    fn extend(&mut self, findings: impl IntoIterator<Item = CheckFinding>) {
        self.findings.extend(findings);
    }

    fn with_severity(&self, severity: Severity) -> Vec<&CheckFinding> {
        let mut found: Vec<_> = self
            .findings
            .iter()
            .filter(|f| f.severity == severity)
            .collect();
        found.sort_by(|a, b| a.category.cmp(&b.category));
        found
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.with_severity(Severity::Error).len()
    }

    pub fn warning_count(&self) -> usize {
        self.with_severity(Severity::Warning).len()
    }

    /// Print human-readable summary.
    pub fn print_summary(&self) {
        let errors = self.with_severity(Severity::Error);
        let warnings = self.with_severity(Severity::Warning);
        let infos = self.with_severity(Severity::Info);

        if !errors.is_empty() {
            println!("\n❌ Errors ({}):", errors.len());
            println!("{}", "─".repeat(60));
            for finding in &errors {
                print_finding(finding);
            }
        }

        if !warnings.is_empty() {
            println!("\n⚠️  Warnings ({}):", warnings.len());
            println!("{}", "─".repeat(60));
            for finding in &warnings {
                print_finding(finding);
            }
        }

        if !infos.is_empty() {
            println!("\nℹ️  Info ({}):", infos.len());
            println!("{}", "─".repeat(60));
            for finding in &infos {
                print_finding(finding);
            }
        }

        println!();
        println!("{}", "═".repeat(60));
        if errors.is_empty() && warnings.is_empty() {
            println!("✅ All checks passed!");
        } else {
            println!(
                "Summary: {} error(s), {} warning(s)",
                errors.len(),
                warnings.len()
            );
            if !errors.is_empty() {
                println!("\n❌ Configuration has errors that must be fixed.");
            }
        }
    }
}

fn print_finding(finding: &CheckFinding) {
    let icon = match finding.severity {
        Severity::Error => "✗",
        Severity::Warning => "⚠",
        Severity::Info => "ℹ",
    };
    let location = finding
        .location
        .as_ref()
        .map(|l| format!(" [{}]", l))
        .unwrap_or_default();

    println!(
        "  {} [{}]{}: {}",
        icon, finding.category, location, finding.message
    );
}

// ============================================================================
// Individual Checks
// ============================================================================

fn check_structure(config: &LandingZoneConfig) -> Vec<CheckFinding> {
    config
        .validate()
        .into_iter()
        .map(|e| CheckFinding::error("structure", e.to_string()))
        .collect()
}

/// Only meaningful once the structure is sound; planning repeats the
/// identifier checks per declaration.
fn check_plan(config: &LandingZoneConfig) -> Vec<CheckFinding> {
    match lz_planner::plan(config) {
        Ok(_) => Vec::new(),
        Err(e) => vec![CheckFinding::error("plan", e.to_string())],
    }
}

fn check_subscriptions(config: &LandingZoneConfig) -> Vec<CheckFinding> {
    let mut findings = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (i, placement) in config.subscriptions.iter().enumerate() {
        let location = format!("subscriptions[{}].subscription_id", i);
        let id = placement.subscription_id.trim();
        if id.is_empty() {
            findings.push(
                CheckFinding::warning(
                    "subscriptions",
                    format!(
                        "No subscription id for the '{}' slot; it will be skipped",
                        placement.group
                    ),
                )
                .with_location(location),
            );
            continue;
        }
        if let Some(first) = seen.insert(id.to_ascii_lowercase(), i) {
            findings.push(
                CheckFinding::error(
                    "subscriptions",
                    format!(
                        "Subscription '{}' is also placed by subscriptions[{}]; a subscription has exactly one parent",
                        id, first
                    ),
                )
                .with_location(location),
            );
        }
    }
    findings
}

fn check_policies(config: &LandingZoneConfig) -> Vec<CheckFinding> {
    let mut findings: Vec<_> = lz_policy::advisories(&config.policies)
        .into_iter()
        .map(|note| CheckFinding::warning("policies", note))
        .collect();

    let policies = &config.policies;
    let default_region = config.regions.default.trim();
    let default_allowed = config
        .regions
        .allowed
        .iter()
        .any(|r| r.eq_ignore_ascii_case(default_region));
    if policies.inherit_tags.active_tags().next().is_some()
        && policies.allowed_locations.enabled
        && !default_allowed
    {
        findings.push(
            CheckFinding::warning(
                "policies",
                format!(
                    "Tag inheritance assignments are placed in '{}', which is not an allowed region",
                    default_region
                ),
            )
            .with_location("regions.default"),
        );
    }
    findings
}

/// Checks against an already-loaded configuration.
pub fn check_config(config: &LandingZoneConfig) -> CheckResults {
    let mut results = CheckResults::default();

    let structure = check_structure(config);
    let structure_ok = structure.is_empty();
    results.extend(structure);
    if structure_ok {
        results.extend(check_plan(config));
    }
    results.extend(check_subscriptions(config));
    results.extend(check_policies(config));

    results.add(CheckFinding::info(
        "apply",
        "Resources that already exist are left as they are; changed settings are not applied to them",
    ));
    results
}

// ============================================================================
// Main Check Runner
// ============================================================================

/// Run all configuration checks quietly (no output), returns the results.
pub fn run_quiet(config_path: &Path) -> Result<CheckResults> {
    let config = LandingZoneConfig::load(config_path).context("Failed to load configuration")?;
    Ok(check_config(&config))
}

/// Run configuration check as a pre-hook before other commands.
/// Returns Ok(()) if no errors found, otherwise prints errors and returns Err.
pub fn run_pre_hook(config_path: &Path) -> Result<()> {
    let results = run_quiet(config_path)?;

    if results.has_errors() {
        eprintln!("\n❌ Configuration check failed. Run `fabric-lz check` for details.\n");
        for finding in results.with_severity(Severity::Error) {
            let location = finding
                .location
                .as_ref()
                .map(|l| format!(" [{}]", l))
                .unwrap_or_default();
            eprintln!("  ✗ [{}]{}: {}", finding.category, location, finding.message);
        }
        eprintln!();
        anyhow::bail!(
            "Configuration has {} error(s). Fix them before continuing.",
            results.error_count()
        );
    }
    Ok(())
}

/// Run the `fabric-lz check` command.
pub fn run(config_path: &Path) -> Result<()> {
    println!("🔍 Checking {}", config_path.display());

    let results = run_quiet(config_path)?;
    results.print_summary();

    tracing::debug!(
        errors = results.error_count(),
        warnings = results.warning_count(),
        "Configuration check finished"
    );

    if results.has_errors() {
        anyhow::bail!("Configuration check failed");
    }
    Ok(())
}
