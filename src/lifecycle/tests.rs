//! Tests for the branch lifecycle.

use super::*;
use crate::model::{Life, OptionType, SafetyBlock};
use crate::safety::BlockAdmin;
use crate::store::MemoryStore;
use std::time::Duration;

fn runner() -> TxnRunner {
    TxnRunner::new(3, Duration::ZERO)
}

fn controller(store: &MemoryStore) -> LifecycleController<'_> {
    LifecycleController::new(store, &Config::default())
        .with_actor("ops@host")
        .with_runner(runner())
}

/// mysql/0..2 and wordpress/0 Alive, mysql declares `pool-size: int`.
fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .seed(&Application::new("mysql").with_option("pool-size", OptionType::Int))
        .unwrap();
    store.seed(&Application::new("wordpress")).unwrap();
    for unit in ["mysql/0", "mysql/1", "mysql/2", "wordpress/0"] {
        store.seed(&Unit::new(unit)).unwrap();
    }
    store
}

fn block(store: &MemoryStore, kind: BlockKind, message: &str) {
    BlockAdmin::new(store, runner()).enable(kind, message).unwrap();
}

// ============================================================================
// Create
// ============================================================================

#[test]
fn test_create_records_creator() {
    let store = seeded_store();
    let branch = controller(&store).create("canary").unwrap();

    assert_eq!(branch.created_by, "ops@host");
    assert!(branch.applications.is_empty());
    assert_eq!(controller(&store).get("canary").unwrap(), branch);
}

#[test]
fn test_create_rejects_invalid_names() {
    let store = seeded_store();
    let lifecycle = controller(&store);

    for name in ["", "master"] {
        let err = lifecycle.create(name).unwrap_err();
        assert!(matches!(err, FleetError::InvalidArgument(_)), "{:?}", name);
    }
    assert!(store.list::<Branch>().unwrap().is_empty());
}

#[test]
fn test_create_duplicate_name() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();

    let err = lifecycle.create("canary").unwrap_err();
    assert!(matches!(err, FleetError::AlreadyExists(_)));
}

#[test]
fn test_create_enforces_single_active_branch() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();

    let err = lifecycle.create("other").unwrap_err();
    assert!(matches!(err, FleetError::AlreadyExists(_)));

    let config = Config {
        max_active_branches: 2,
        ..Config::default()
    };
    LifecycleController::new(&store, &config).create("other").unwrap();
}

// ============================================================================
// AssignUnit
// ============================================================================

#[test]
fn test_assign_unit_observes_application_units() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();

    let branch = lifecycle.assign_unit("canary", "mysql", "mysql/1").unwrap();

    let state = &branch.applications["mysql"];
    assert_eq!(state.tracking.iter().collect::<Vec<_>>(), vec!["mysql/1"]);
    assert_eq!(state.pending.iter().collect::<Vec<_>>(), vec!["mysql/0", "mysql/2"]);
    assert!(!branch.applications.contains_key("wordpress"));
}

#[test]
fn test_assign_unit_is_idempotent() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();

    let first = lifecycle.assign_unit("canary", "mysql", "mysql/0").unwrap();
    let version = store.require::<Branch>("canary").unwrap().version;
    let second = lifecycle.assign_unit("canary", "mysql", "mysql/0").unwrap();

    assert_eq!(first, second);
    assert_eq!(second.applications["mysql"].tracking.len(), 1);
    assert_eq!(store.require::<Branch>("canary").unwrap().version, version);
}

#[test]
fn test_assign_unit_errors() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();

    let err = lifecycle.assign_unit("ghost", "mysql", "mysql/0").unwrap_err();
    assert_eq!(err.to_string(), "branch \"ghost\" not found");

    let err = lifecycle.assign_unit("canary", "mysql", "mysql/9").unwrap_err();
    assert_eq!(err.to_string(), "unit \"mysql/9\" not found");

    let err = lifecycle.assign_unit("canary", "mysql", "wordpress/0").unwrap_err();
    assert!(matches!(err, FleetError::InvalidArgument(_)));

    let mut dying = Unit::new("mysql/2");
    dying.life = Life::Dying;
    store.seed(&dying).unwrap();
    let err = lifecycle.assign_unit("canary", "mysql", "mysql/2").unwrap_err();
    assert!(matches!(err, FleetError::InvalidArgument(_)));

    assert!(lifecycle.get("canary").unwrap().applications.is_empty());
}

#[test]
fn test_assign_all_units() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();
    lifecycle.assign_unit("canary", "mysql", "mysql/0").unwrap();

    let branch = lifecycle.assign_all_units("canary", "mysql").unwrap();

    let state = &branch.applications["mysql"];
    assert_eq!(state.tracking.len(), 3);
    assert!(state.pending.is_empty());
}

#[test]
fn test_concurrent_assign_loses_no_update() {
    let store = MemoryStore::new();
    store.seed(&Application::new("a")).unwrap();
    let units: Vec<String> = (0..8).map(|i| format!("a/{}", i)).collect();
    for unit in &units {
        store.seed(&Unit::new(unit.as_str())).unwrap();
    }
    controller(&store).create("canary").unwrap();

    std::thread::scope(|scope| {
        for unit in &units {
            let store = &store;
            scope.spawn(move || {
                let lifecycle = controller(store);
                // Callers are expected to retry a transient Conflict.
                loop {
                    match lifecycle.assign_unit("canary", "a", unit) {
                        Ok(_) => break,
                        Err(e) if e.is_transient() => continue,
                        Err(e) => panic!("assign {} failed: {}", unit, e),
                    }
                }
            });
        }
    });

    let branch = controller(&store).get("canary").unwrap();
    let state = &branch.applications["a"];
    assert_eq!(state.tracking.len(), units.len());
    assert!(state.pending.is_empty());
}

// ============================================================================
// SetConfig / ResetConfig
// ============================================================================

#[test]
fn test_set_config_stages_delta_and_observes_units() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();

    let branch = lifecycle
        .set_config("canary", "mysql", "pool-size", ConfigValue::Int(16))
        .unwrap();

    let state = &branch.applications["mysql"];
    assert_eq!(state.config_delta["pool-size"], ConfigValue::Int(16));
    assert_eq!(state.pending.len(), 3);
    assert!(state.tracking.is_empty());

    // Baseline untouched until commit.
    let app = store.require::<Application>("mysql").unwrap();
    assert!(app.doc.config.is_empty());
}

#[test]
fn test_set_config_validates_against_options() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();

    let err = lifecycle
        .set_config("canary", "mysql", "pool-size", ConfigValue::String("big".to_string()))
        .unwrap_err();
    assert!(matches!(err, FleetError::InvalidArgument(_)));

    let err = lifecycle
        .set_config("canary", "postgres", "x", ConfigValue::Int(1))
        .unwrap_err();
    assert!(matches!(err, FleetError::NotFound(_)));
}

#[test]
fn test_reset_config() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();
    lifecycle
        .set_config("canary", "wordpress", "theme", ConfigValue::String("dark".to_string()))
        .unwrap();

    let branch = lifecycle.reset_config("canary", "wordpress", "theme").unwrap();
    assert!(branch.applications["wordpress"].config_delta.is_empty());

    lifecycle.reset_config("canary", "wordpress", "theme").unwrap();
    lifecycle.reset_config("canary", "mysql", "anything").unwrap();
}

#[test]
fn test_reset_configs_drops_keys_together() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();
    let settings = [
        ("theme".to_string(), ConfigValue::String("dark".to_string())),
        ("debug".to_string(), ConfigValue::Bool(true)),
        ("workers".to_string(), ConfigValue::Int(4)),
    ];
    lifecycle.set_configs("canary", "wordpress", &settings).unwrap();
    let before = lifecycle.branches().get_versioned("canary").unwrap().version;

    let branch = lifecycle
        .reset_configs("canary", "wordpress", &["theme", "debug", "absent"])
        .unwrap();

    let delta = &branch.applications["wordpress"].config_delta;
    assert_eq!(delta.keys().collect::<Vec<_>>(), vec!["workers"]);
    assert_eq!(
        lifecycle.branches().get_versioned("canary").unwrap().version,
        before + 1
    );
}

#[test]
fn test_change_block_refuses_config_changes() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();
    block(&store, BlockKind::Change, "change freeze");

    let err = lifecycle
        .set_config("canary", "wordpress", "theme", ConfigValue::Bool(true))
        .unwrap_err();
    assert!(matches!(err, FleetError::Blocked(ref m) if m == "change freeze"));

    let err = lifecycle.reset_config("canary", "wordpress", "theme").unwrap_err();
    assert!(matches!(err, FleetError::Blocked(_)));
}

// ============================================================================
// Commit
// ============================================================================

#[test]
fn test_commit_merges_every_application_and_deletes_branch() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();
    lifecycle
        .set_config("canary", "mysql", "pool-size", ConfigValue::Int(16))
        .unwrap();
    lifecycle
        .set_config("canary", "wordpress", "theme", ConfigValue::String("dark".to_string()))
        .unwrap();

    let committed = lifecycle.commit("canary").unwrap();
    assert_eq!(committed.applications.len(), 2);

    let mysql = store.require::<Application>("mysql").unwrap().doc;
    let wordpress = store.require::<Application>("wordpress").unwrap().doc;
    assert_eq!(mysql.config["pool-size"], ConfigValue::Int(16));
    assert_eq!(wordpress.config["theme"], ConfigValue::String("dark".to_string()));

    assert!(matches!(lifecycle.get("canary"), Err(FleetError::NotFound(_))));
    // The active slot is free again.
    lifecycle.create("next").unwrap();
}

#[test]
fn test_commit_is_all_or_nothing() {
    let store = seeded_store();
    store.seed(&Application::new("redis")).unwrap();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();
    lifecycle
        .set_config("canary", "mysql", "pool-size", ConfigValue::Int(16))
        .unwrap();
    lifecycle
        .set_config("canary", "redis", "maxmemory", ConfigValue::String("1gb".to_string()))
        .unwrap();
    lifecycle
        .set_config("canary", "wordpress", "theme", ConfigValue::String("dark".to_string()))
        .unwrap();

    // redis now declares a schema the staged key is not part of.
    store
        .seed(&Application::new("redis").with_option("port", OptionType::Int))
        .unwrap();
    let before = lifecycle.get("canary").unwrap();

    let err = lifecycle.commit("canary").unwrap_err();
    match err {
        FleetError::CommitFailed {
            branch,
            application,
            ..
        } => {
            assert_eq!(branch, "canary");
            assert_eq!(application, "redis");
        }
        other => panic!("expected CommitFailed, got {:?}", other),
    }

    for app in ["mysql", "redis", "wordpress"] {
        assert!(store.require::<Application>(app).unwrap().doc.config.is_empty());
    }
    assert_eq!(lifecycle.get("canary").unwrap(), before);
}

#[test]
fn test_commit_missing_application_fails() {
    let store = seeded_store();
    store.seed(&Application::new("gone")).unwrap();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();
    lifecycle
        .set_config("canary", "gone", "k", ConfigValue::Int(1))
        .unwrap();
    store
        .apply(&[TxnOp::delete::<Application>("gone", 1)])
        .unwrap();

    let err = lifecycle.commit("canary").unwrap_err();
    assert!(err.to_string().contains("application not found"));
    assert!(lifecycle.get("canary").is_ok());
}

#[test]
fn test_commit_blocked_by_change_block() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();
    block(&store, BlockKind::All, "freeze");

    assert!(matches!(lifecycle.commit("canary"), Err(FleetError::Blocked(_))));
    assert!(lifecycle.get("canary").is_ok());
}

// ============================================================================
// Abort
// ============================================================================

#[test]
fn test_abort_then_abort_again() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();
    lifecycle
        .set_config("canary", "mysql", "pool-size", ConfigValue::Int(4))
        .unwrap();

    lifecycle.abort("canary").unwrap();

    assert!(matches!(lifecycle.get("canary"), Err(FleetError::NotFound(_))));
    assert!(store.require::<Application>("mysql").unwrap().doc.config.is_empty());

    let err = lifecycle.abort("canary").unwrap_err();
    assert!(matches!(err, FleetError::NotFound(_)));
}

#[test]
fn test_abort_ignores_blocks() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();
    block(&store, BlockKind::All, "freeze");

    lifecycle.abort("canary").unwrap();
    assert!(store.get::<SafetyBlock>("all").unwrap().unwrap().doc.active);
}

// ============================================================================
// Summaries
// ============================================================================

#[test]
fn test_summaries() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();
    lifecycle.assign_unit("canary", "mysql", "mysql/0").unwrap();

    let all = lifecycle.summaries(None, false).unwrap();
    assert_eq!(all.len(), 1);
    let summary = &all["canary"];
    assert_eq!(summary.created_by, "ops@host");
    assert_eq!(summary.applications[0].progress, "1/3 units tracking");

    let one = lifecycle.summaries(Some("canary"), true).unwrap();
    let detail = one["canary"].applications[0].unit_detail.as_ref().unwrap();
    assert_eq!(detail.tracking, vec!["mysql/0"]);

    assert!(matches!(
        lifecycle.summaries(Some("ghost"), false),
        Err(FleetError::NotFound(_))
    ));
}

#[test]
fn test_partition_holds_after_every_operation() {
    let store = seeded_store();
    let lifecycle = controller(&store);
    lifecycle.create("canary").unwrap();

    let check = |branch: &Branch| {
        for (app, state) in &branch.applications {
            assert!(state.tracking.is_disjoint(&state.pending));
            let expected: Vec<String> = store
                .list::<Unit>()
                .unwrap()
                .into_iter()
                .filter(|u| u.doc.application() == app && u.doc.is_alive())
                .map(|u| u.doc.name)
                .collect();
            assert_eq!(state.known_units().into_iter().collect::<Vec<_>>(), expected);
        }
    };

    check(&lifecycle.assign_unit("canary", "mysql", "mysql/2").unwrap());
    check(&lifecycle.set_config("canary", "mysql", "pool-size", ConfigValue::Int(2)).unwrap());
    check(&lifecycle.assign_unit("canary", "mysql", "mysql/0").unwrap());
    check(&lifecycle.assign_all_units("canary", "wordpress").unwrap());
}

// ============================================================================
// Baseline configuration
// ============================================================================

#[test]
fn test_set_baseline_config() {
    let store = seeded_store();
    let lifecycle = controller(&store);

    let app = lifecycle
        .set_baseline_config("mysql", &[("pool-size".to_string(), ConfigValue::Int(32))])
        .unwrap();
    assert_eq!(app.config["pool-size"], ConfigValue::Int(32));
    assert_eq!(store.require::<Application>("mysql").unwrap().version, 2);

    let err = lifecycle
        .set_baseline_config(
            "mysql",
            &[
                ("pool-size".to_string(), ConfigValue::Int(1)),
                ("engine".to_string(), ConfigValue::Int(1)),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, FleetError::InvalidArgument(_)));
    assert_eq!(
        store.require::<Application>("mysql").unwrap().doc.config["pool-size"],
        ConfigValue::Int(32)
    );
}

#[test]
fn test_set_baseline_config_blocked() {
    let store = seeded_store();
    block(&store, BlockKind::Change, "frozen");

    let err = controller(&store)
        .set_baseline_config("wordpress", &[("theme".to_string(), ConfigValue::Bool(true))])
        .unwrap_err();
    assert!(matches!(err, FleetError::Blocked(_)));
}
