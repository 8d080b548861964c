//! Tests for the transactional store.

use super::txn::Write;
use super::*;
use crate::context::ModelContext;
use crate::locks::acquire_lock;
use crate::model::{Branch, MODEL_DOC_ID, ModelDoc, Unit};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tempfile::TempDir;

fn runner(attempts: u32) -> TxnRunner {
    TxnRunner::new(attempts, Duration::ZERO)
}

fn file_store() -> (TempDir, ModelContext, FileStore) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = ModelContext::at(temp_dir.path().to_path_buf());
    std::fs::create_dir_all(&ctx.state_dir).unwrap();
    let store = FileStore::open(&ctx).unwrap();
    (temp_dir, ctx, store)
}

/// Aborts the first `failures` transactions it sees.
struct FlakyStore {
    inner: MemoryStore,
    failures: u32,
    applies: AtomicU32,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures,
            applies: AtomicU32::new(0),
        }
    }
}

impl ModelStore for FlakyStore {
    fn read(&self, key: &DocKey) -> crate::error::Result<Option<RawDoc>> {
        self.inner.read(key)
    }

    fn list_ids(&self, kind: DocKind) -> crate::error::Result<Vec<String>> {
        self.inner.list_ids(kind)
    }

    fn apply(&self, ops: &[TxnOp]) -> crate::error::Result<TxnStatus> {
        if self.applies.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Ok(TxnStatus::Aborted);
        }
        self.inner.apply(ops)
    }
}

// Every backend must pass the same contract.
fn check_store_contract(store: &dyn ModelStore) {
    let unit = Unit::new("mysql/0");

    assert_eq!(store.apply(&[TxnOp::insert(&unit).unwrap()]).unwrap(), TxnStatus::Committed);
    let stored = store.get::<Unit>("mysql/0").unwrap().unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.doc, unit);

    // Inserting again violates Missing.
    assert_eq!(store.apply(&[TxnOp::insert(&unit).unwrap()]).unwrap(), TxnStatus::Aborted);

    // Stale version aborts; current version commits and bumps.
    let mut dying = unit.clone();
    dying.life = crate::model::Life::Dying;
    assert_eq!(store.apply(&[TxnOp::update(7, &dying).unwrap()]).unwrap(), TxnStatus::Aborted);
    assert_eq!(store.apply(&[TxnOp::update(1, &dying).unwrap()]).unwrap(), TxnStatus::Committed);
    assert_eq!(store.get::<Unit>("mysql/0").unwrap().unwrap().version, 2);

    // One failing assertion means nothing is written.
    let other = Unit::new("mysql/1");
    let ops = [
        TxnOp::insert(&other).unwrap(),
        TxnOp::check::<Unit>("mysql/0", Some(1)),
    ];
    assert_eq!(store.apply(&ops).unwrap(), TxnStatus::Aborted);
    assert!(store.get::<Unit>("mysql/1").unwrap().is_none());

    store.apply(&[TxnOp::insert(&other).unwrap()]).unwrap();
    assert_eq!(store.list_ids(DocKind::Unit).unwrap(), vec!["mysql/0", "mysql/1"]);
    assert!(store.list_ids(DocKind::Branch).unwrap().is_empty());

    assert_eq!(
        store.apply(&[TxnOp::delete::<Unit>("mysql/0", 2)]).unwrap(),
        TxnStatus::Committed
    );
    assert!(store.get::<Unit>("mysql/0").unwrap().is_none());
    assert_eq!(store.list::<Unit>().unwrap().len(), 1);
    assert_eq!(store.list_ids(DocKind::Unit).unwrap(), vec!["mysql/1"]);

    // The deleted document counts as missing.
    assert_eq!(
        store.apply(&[TxnOp::check::<Unit>("mysql/0", None)]).unwrap(),
        TxnStatus::Committed
    );

    // A recreated document continues the version count, so a token from
    // before the delete never matches it.
    assert_eq!(store.apply(&[TxnOp::insert(&unit).unwrap()]).unwrap(), TxnStatus::Committed);
    assert_eq!(store.get::<Unit>("mysql/0").unwrap().unwrap().version, 3);
    assert_eq!(store.apply(&[TxnOp::update(2, &dying).unwrap()]).unwrap(), TxnStatus::Aborted);
    assert_eq!(store.apply(&[TxnOp::update(1, &dying).unwrap()]).unwrap(), TxnStatus::Aborted);
    assert_eq!(store.get::<Unit>("mysql/0").unwrap().unwrap().doc.life, crate::model::Life::Alive);
}

#[test]
fn test_memory_store_contract() {
    check_store_contract(&MemoryStore::new());
}

#[test]
fn test_file_store_contract() {
    let (_temp_dir, _ctx, store) = file_store();
    check_store_contract(&store);
}

#[test]
fn test_duplicate_key_in_transaction_is_rejected() {
    let store = MemoryStore::new();
    let unit = Unit::new("a/0");
    let ops = [TxnOp::insert(&unit).unwrap(), TxnOp::check::<Unit>("a/0", None)];

    assert!(store.apply(&ops).is_err());
}

#[test]
fn test_require_reports_not_found() {
    let store = MemoryStore::new();
    let err = store.require::<Branch>("canary").unwrap_err();
    assert_eq!(err.to_string(), "branch \"canary\" not found");
}

#[test]
fn test_file_store_layout() {
    let (_temp_dir, ctx, store) = file_store();
    store.apply(&[TxnOp::insert(&Unit::new("mysql/0")).unwrap()]).unwrap();

    let path = ctx.state_dir.join("unit").join("mysql%2F0.json");
    let raw: RawDoc = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(raw.version, 1);
    assert_eq!(raw.doc["life"], "alive");
    assert!(!ctx.journal_path().exists());
    assert!(!ctx.txn_lock_path().exists());
}

#[test]
fn test_file_store_delete_leaves_tombstone() {
    let (_temp_dir, ctx, store) = file_store();
    store.apply(&[TxnOp::insert(&Unit::new("a/0")).unwrap()]).unwrap();
    store.apply(&[TxnOp::delete::<Unit>("a/0", 1)]).unwrap();

    let path = ctx.state_dir.join("unit").join("a%2F0.json");
    let slot: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(slot, serde_json::json!({ "version": 1 }));
    assert!(store.list_ids(DocKind::Unit).unwrap().is_empty());

    store.apply(&[TxnOp::insert(&Unit::new("a/0")).unwrap()]).unwrap();
    assert_eq!(store.get::<Unit>("a/0").unwrap().unwrap().version, 2);
}

#[test]
fn test_file_store_list_skips_temp_files() {
    let (_temp_dir, ctx, store) = file_store();
    store.apply(&[TxnOp::insert(&Unit::new("a/0")).unwrap()]).unwrap();
    std::fs::write(ctx.state_dir.join("unit").join(".a%2F1.json.tmp"), "{}").unwrap();

    assert_eq!(store.list_ids(DocKind::Unit).unwrap(), vec!["a/0"]);
}

#[test]
fn test_file_store_aborts_while_lock_held() {
    let (_temp_dir, ctx, store) = file_store();
    let guard = acquire_lock(&ctx.txn_lock_path(), "test").unwrap();

    let status = store.apply(&[TxnOp::insert(&Unit::new("a/0")).unwrap()]).unwrap();
    assert_eq!(status, TxnStatus::Aborted);

    drop(guard);
    let status = store.apply(&[TxnOp::insert(&Unit::new("a/0")).unwrap()]).unwrap();
    assert_eq!(status, TxnStatus::Committed);
}

#[test]
fn test_file_store_rolls_forward_interrupted_commit() {
    let (_temp_dir, ctx, _) = file_store();

    let unit = Unit::new("a/0");
    let writes = vec![Write::Put {
        key: unit.key(),
        doc: RawDoc {
            version: 1,
            doc: serde_json::to_value(&unit).unwrap(),
        },
    }];
    std::fs::write(ctx.journal_path(), serde_json::to_vec(&writes).unwrap()).unwrap();

    let store = FileStore::open(&ctx).unwrap();

    assert!(!ctx.journal_path().exists());
    assert_eq!(store.get::<Unit>("a/0").unwrap().unwrap().version, 1);

    // Replaying the same journal again changes nothing.
    std::fs::write(ctx.journal_path(), serde_json::to_vec(&writes).unwrap()).unwrap();
    let store = FileStore::open(&ctx).unwrap();
    assert_eq!(store.get::<Unit>("a/0").unwrap().unwrap().version, 1);
}

#[test]
fn test_runner_retries_aborted_transactions() {
    let store = FlakyStore::new(2);
    let mut attempts = Vec::new();

    runner(3)
        .run(&store, "insert", |attempt| {
            attempts.push(attempt);
            Ok(vec![TxnOp::insert(&Unit::new("a/0"))?])
        })
        .unwrap();

    assert_eq!(attempts, vec![0, 1, 2]);
    assert!(store.get::<Unit>("a/0").unwrap().is_some());
}

#[test]
fn test_runner_reports_conflict_when_exhausted() {
    let store = FlakyStore::new(u32::MAX);

    let err = runner(3)
        .run(&store, "insert unit", |_| Ok(vec![TxnOp::insert(&Unit::new("a/0"))?]))
        .unwrap_err();

    assert!(matches!(err, crate::error::FleetError::Conflict(_)));
    assert!(err.is_transient());
    assert_eq!(store.applies.load(Ordering::SeqCst), 3);
}

#[test]
fn test_runner_empty_ops_is_noop() {
    let store = FlakyStore::new(u32::MAX);
    runner(3).run(&store, "nothing", |_| Ok(Vec::new())).unwrap();
    assert_eq!(store.applies.load(Ordering::SeqCst), 0);
}

#[test]
fn test_runner_stops_on_builder_error() {
    let store = MemoryStore::new();
    let mut calls = 0;

    let err = runner(3)
        .run(&store, "fail", |_| {
            calls += 1;
            Err(crate::error::FleetError::not_found("unit", "x/0"))
        })
        .unwrap_err();

    assert!(matches!(err, crate::error::FleetError::NotFound(_)));
    assert_eq!(calls, 1);
}

// ============================================================================
// BranchStore
// ============================================================================

#[test]
fn test_branch_create_and_get() {
    let store = MemoryStore::new();
    let branches = BranchStore::new(&store, runner(3));

    branches.create(&Branch::new("canary", "ops@host")).unwrap();

    assert_eq!(branches.get("canary").unwrap().created_by, "ops@host");
    let model = store.require::<ModelDoc>(MODEL_DOC_ID).unwrap();
    assert!(model.doc.active_branches.contains("canary"));
}

#[test]
fn test_branch_create_duplicate() {
    let store = MemoryStore::new();
    let branches = BranchStore::new(&store, runner(3));
    branches.create(&Branch::new("canary", "ops@host")).unwrap();

    let err = branches.create(&Branch::new("canary", "other@host")).unwrap_err();
    assert!(matches!(err, crate::error::FleetError::AlreadyExists(_)));
    assert_eq!(branches.get("canary").unwrap().created_by, "ops@host");
}

#[test]
fn test_branch_create_respects_active_limit() {
    let store = MemoryStore::new();
    let branches = BranchStore::new(&store, runner(3)).with_max_active(1);
    branches.create(&Branch::new("canary", "ops@host")).unwrap();

    let err = branches.create(&Branch::new("second", "ops@host")).unwrap_err();
    assert_eq!(err.to_string(), "active branch \"canary\" already exists");
    assert_eq!(branches.list().unwrap().len(), 1);
}

#[test]
fn test_branch_update_and_noop_update() {
    let store = MemoryStore::new();
    let branches = BranchStore::new(&store, runner(3));
    branches.create(&Branch::new("canary", "ops@host")).unwrap();

    branches
        .update("canary", |b| {
            b.app_mut("mysql").track("mysql/0");
            Ok(())
        })
        .unwrap();
    assert_eq!(branches.get_versioned("canary").unwrap().version, 2);

    // Unchanged branch is not rewritten.
    branches.update("canary", |_| Ok(())).unwrap();
    assert_eq!(branches.get_versioned("canary").unwrap().version, 2);
}

#[test]
fn test_branch_update_does_not_overwrite_recreated_branch() {
    let store = MemoryStore::new();
    let branches = BranchStore::new(&store, runner(3));
    branches.create(&Branch::new("canary", "ops@host")).unwrap();

    let other = BranchStore::new(&store, runner(3));
    let mut recreated = false;
    let branch = branches
        .update("canary", |b| {
            // Another session replaces the branch after this one read it.
            if !recreated {
                other.delete("canary").unwrap();
                other.create(&Branch::new("canary", "someone-else@host")).unwrap();
                recreated = true;
            }
            b.app_mut("mysql").track("mysql/0");
            Ok(())
        })
        .unwrap();

    let stored = branches.get_versioned("canary").unwrap();
    assert_eq!(stored.doc.created_by, "someone-else@host");
    assert_eq!(stored.doc, branch);
    assert_eq!(stored.version, 3);
    assert!(stored.doc.applications["mysql"].tracking.contains("mysql/0"));
}

#[test]
fn test_branch_update_missing_is_not_found() {
    let store = MemoryStore::new();
    let branches = BranchStore::new(&store, runner(3));

    let err = branches.update("ghost", |_| Ok(())).unwrap_err();
    assert!(matches!(err, crate::error::FleetError::NotFound(_)));
}

#[test]
fn test_branch_delete_frees_active_slot() {
    let store = MemoryStore::new();
    let branches = BranchStore::new(&store, runner(3)).with_max_active(1);
    branches.create(&Branch::new("canary", "ops@host")).unwrap();

    branches.delete("canary").unwrap();

    assert!(branches.list().unwrap().is_empty());
    let err = branches.delete("canary").unwrap_err();
    assert!(matches!(err, crate::error::FleetError::NotFound(_)));
    branches.create(&Branch::new("second", "ops@host")).unwrap();
}

#[test]
fn test_branch_store_over_file_store() {
    let (_temp_dir, _ctx, store) = file_store();
    let branches = BranchStore::new(&store, runner(3));

    branches.create(&Branch::new("feature/x", "ops@host")).unwrap();
    let names: Vec<_> = branches.list().unwrap().into_iter().map(|b| b.name).collect();
    assert_eq!(names, vec!["feature/x"]);
}
