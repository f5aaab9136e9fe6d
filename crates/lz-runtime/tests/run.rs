//! Full runs over a planned landing zone against the in-memory remote.

use std::time::Duration;

use lz_core::config::{LandingZoneConfig, SubscriptionPlacementConfig};
use lz_core::{ApplyContext, ApplyState, DesiredResource, ResourceKind};
use lz_runtime::{Applier, InMemoryRemote, MutationCall};

const SUBSCRIPTION: &str = "11111111-1111-1111-1111-111111111111";

fn config() -> LandingZoneConfig {
    let mut config = LandingZoneConfig::default();
    config.organization.prefix = "Target".to_string();
    config.subscriptions = vec![
        SubscriptionPlacementConfig {
            subscription_id: SUBSCRIPTION.to_string(),
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

fn declarations() -> Vec<DesiredResource> {
    lz_planner::plan(&config()).unwrap().into_declarations()
}

fn ctx(simulate: bool) -> ApplyContext {
    config()
        .apply_context(simulate)
        .with_settle_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_full_run_then_rerun_is_idempotent() {
    let applier = Applier::new(InMemoryRemote::new().require_parents(true));
    let declarations = declarations();

    let first = applier.run(&declarations, &ctx(false)).await;
    assert!(first.is_success(), "{:?}", first.failures().collect::<Vec<_>>());
    let summary = first.summary();
    assert_eq!(summary.created, 13);
    assert_eq!(summary.skipped, 1);
    let mutations = applier.remote().mutation_count();
    assert_eq!(mutations, 13);

    let second = applier.run(&declarations, &ctx(false)).await;
    assert!(second.is_success());
    assert_eq!(second.summary().exists, 13);
    assert_eq!(second.summary().skipped, 1);
    assert_eq!(applier.remote().mutation_count(), mutations);
}

#[tokio::test]
async fn test_simulate_never_mutates() {
    let applier = Applier::new(InMemoryRemote::new());
    let report = applier.run(&declarations(), &ctx(true)).await;

    assert!(report.simulated);
    assert!(report.outcomes.iter().all(|o| o.simulated));
    assert_eq!(report.summary().would_create, 13);
    assert_eq!(applier.remote().mutation_count(), 0);

    let root = &report.outcomes[0];
    assert_eq!(root.identity, "Target-ALZ");
    assert_eq!(root.state, ApplyState::WouldCreate);
    assert!(root.to_log_line().starts_with("[simulate] "));
}

#[tokio::test]
async fn test_existing_root_is_not_recreated() {
    let applier = Applier::new(InMemoryRemote::new().with_group("Target-ALZ", "ALZ", None));
    let report = applier.run(&declarations(), &ctx(false)).await;

    assert_eq!(report.outcomes[0].state, ApplyState::AlreadyExists);
    assert!(!applier.remote().calls().iter().any(|call| matches!(
        call,
        MutationCall::CreateManagementGroup { id, .. } if id == "Target-ALZ"
    )));
}

#[tokio::test]
async fn test_group_failure_aborts_children() {
    let applier = Applier::new(InMemoryRemote::new().fail_mutation("Target-Platform"));
    let declarations = declarations();
    let report = applier.run(&declarations, &ctx(false)).await;

    assert!(report.aborted);
    assert!(!report.is_success());
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[1].identity, "Target-Platform");
    assert!(report.outcomes[1].state.is_failure());
    assert_eq!(report.not_attempted, declarations.len() - 2);

    // The failed attempt is the last thing the remote saw
    let calls = applier.remote().calls();
    assert_eq!(calls.len(), 2);
}

#[tokio::test]
async fn test_policy_failure_is_isolated() {
    let applier = Applier::new(InMemoryRemote::new().fail_mutation("Allowed-Locations"));
    let report = applier.run(&declarations(), &ctx(false)).await;

    assert!(!report.aborted);
    assert!(!report.is_success());
    let failed: Vec<_> = report.failures().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].kind, ResourceKind::PolicyAssignment);
    // Later assignments still ran
    assert!(
        report
            .outcomes
            .iter()
            .any(|o| o.identity.ends_with("/Require-Tag-Environment")
                && o.state == ApplyState::Created)
    );
}

#[tokio::test(start_paused = true)]
async fn test_settle_delay_after_each_created_group() {
    let applier = Applier::new(InMemoryRemote::new());
    let ctx = config()
        .apply_context(false)
        .with_settle_delay(Duration::from_secs(5));

    let started = tokio::time::Instant::now();
    let report = applier.run(&declarations(), &ctx).await;
    let elapsed = started.elapsed();

    assert!(report.is_success());
    // Eight groups created, each followed by another declaration
    assert!(elapsed >= Duration::from_secs(40), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(45), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_no_settle_delay_when_groups_exist() {
    let remote = LandingZoneConfig::default()
        .management_groups
        .ids()
        .into_iter()
        .fold(InMemoryRemote::new(), |remote, id| {
            remote.with_group(&format!("Target-{id}"), id, None)
        });
    let applier = Applier::new(remote);
    let ctx = config()
        .apply_context(false)
        .with_settle_delay(Duration::from_secs(5));

    let started = tokio::time::Instant::now();
    let report = applier.run(&declarations(), &ctx).await;
    assert_eq!(report.summary().exists, 8);
    assert!(started.elapsed() < Duration::from_secs(1));
}
