//! Edit lifecycle of the version controller: apply, amend, finalize,
//! explicit snapshots, patch-driven edits and archiving.

use std::sync::Arc;

use revlex_core::errors::ExErrorKind;
use revlex_core::ledger::MemoryLedgerStore;
use revlex_core::model::{ChangeKind, ChangeMeta, Lifecycle};
use revlex_core::patch::{Patch, PatchOp};
use revlex_core::Severity;
use revlex_engine::{EngineConfig, VersionController};

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn controller() -> VersionController<MemoryLedgerStore> {
    VersionController::new(Arc::new(MemoryLedgerStore::new()), EngineConfig::default())
}

fn meta() -> ChangeMeta {
    ChangeMeta::manual("alice")
}

// ---------------------------------------------------------------------------
// apply_change / finalize
// ---------------------------------------------------------------------------

#[test]
fn test_apply_change_opens_snapshot() {
    // GIVEN a fresh customization
    let vc = controller();
    let c = vc.create_customization("a\nb", "shop", "alice").unwrap();

    // WHEN the text is changed
    let outcome = vc.apply_change(&c.id, "a\nB", meta()).unwrap();

    // THEN an open snapshot at sequence 2 holds the edit
    assert!(outcome.changed);
    let snapshot = outcome.snapshot.unwrap();
    assert_eq!(snapshot.sequence, 2);
    assert_eq!(snapshot.lifecycle, Lifecycle::Open);

    let stored = vc.customization(&c.id).unwrap();
    assert_eq!(stored.current_text, "a\nB");
    assert_eq!(stored.open_snapshot_id.as_deref(), Some(snapshot.id.as_str()));
    assert_eq!(stored.head_sequence, 2);
}

#[test]
fn test_repeated_edits_amend_open_snapshot() {
    // GIVEN an open snapshot
    let vc = controller();
    let c = vc.create_customization("one", "s", "alice").unwrap();
    let first = vc.apply_change(&c.id, "two", meta()).unwrap().snapshot.unwrap();

    // WHEN the text is edited twice more
    vc.apply_change(&c.id, "three", meta()).unwrap();
    let last = vc
        .apply_change(&c.id, "four", ChangeMeta::ai("bot").with_summary("rewrite"))
        .unwrap()
        .snapshot
        .unwrap();

    // THEN the same snapshot was amended, keeping its id and sequence
    assert_eq!(last.id, first.id);
    assert_eq!(last.sequence, 2);
    assert_eq!(last.kind, ChangeKind::Ai);
    assert_eq!(last.summary, "rewrite");
    assert_eq!(vc.history(&c.id).unwrap().len(), 2);

    // AND the snapshot still starts from the original text
    assert_eq!(vc.reconstruct(&c.id, 1).unwrap(), "one");
    assert_eq!(vc.reconstruct(&c.id, 2).unwrap(), "four");
}

#[test]
fn test_unchanged_text_writes_nothing() {
    let vc = controller();
    let c = vc.create_customization("same", "s", "alice").unwrap();

    let outcome = vc.apply_change(&c.id, "same", meta()).unwrap();

    assert!(!outcome.changed);
    assert!(outcome.snapshot.is_none());
    assert_eq!(vc.customization(&c.id).unwrap().revision, c.revision);
}

#[test]
fn test_finalize_is_idempotent() {
    // GIVEN an open snapshot
    let vc = controller();
    let c = vc.create_customization("a", "s", "alice").unwrap();
    vc.apply_change(&c.id, "b", meta()).unwrap();

    // WHEN finalize is called twice
    let first = vc.finalize_open_snapshot(&c.id).unwrap();
    let revision = vc.customization(&c.id).unwrap().revision;
    let second = vc.finalize_open_snapshot(&c.id).unwrap();

    // THEN the second call changes nothing
    assert_eq!(first.unwrap().lifecycle, Lifecycle::Finalized);
    assert!(second.is_none());
    let stored = vc.customization(&c.id).unwrap();
    assert_eq!(stored.revision, revision);
    assert!(stored.open_snapshot_id.is_none());
}

#[test]
fn test_edit_after_finalize_appends() {
    let vc = controller();
    let c = vc.create_customization("a", "s", "alice").unwrap();
    vc.apply_change(&c.id, "b", meta()).unwrap();
    vc.finalize_open_snapshot(&c.id).unwrap();

    let snapshot = vc.apply_change(&c.id, "c", meta()).unwrap().snapshot.unwrap();

    assert_eq!(snapshot.sequence, 3);
    assert!(snapshot.is_open());
}

#[test]
fn test_commit_change_finalizes_in_one_call() {
    let vc = controller();
    let c = vc.create_customization("a", "s", "alice").unwrap();
    vc.apply_change(&c.id, "b", meta()).unwrap();

    // Amends the open snapshot and seals it
    let snapshot = vc.commit_change(&c.id, "c", meta()).unwrap().snapshot.unwrap();

    assert_eq!(snapshot.sequence, 2);
    assert!(snapshot.is_finalized());
    assert!(vc.customization(&c.id).unwrap().open_snapshot_id.is_none());
}

#[test]
fn test_unknown_customization_is_not_found() {
    let vc = controller();

    let err = vc.finalize_open_snapshot("cust:nope").unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

// ---------------------------------------------------------------------------
// create_snapshot
// ---------------------------------------------------------------------------

#[test]
fn test_create_snapshot_seals_open_and_appends() {
    // GIVEN an open snapshot
    let vc = controller();
    let c = vc.create_customization("a", "s", "alice").unwrap();
    vc.apply_change(&c.id, "b", meta()).unwrap();

    // WHEN an explicit snapshot is recorded from the current text
    let snapshot = vc
        .create_snapshot(&c.id, "b", "b\nc", meta())
        .unwrap()
        .unwrap();

    // THEN the open one is finalized and the new one follows it
    assert_eq!(snapshot.sequence, 3);
    assert!(snapshot.is_finalized());
    let history = vc.history(&c.id).unwrap();
    assert!(history.iter().all(|s| s.is_finalized()));
    assert_eq!(vc.customization(&c.id).unwrap().current_text, "b\nc");
}

#[test]
fn test_create_snapshot_requires_current_text() {
    let vc = controller();
    let c = vc.create_customization("a", "s", "alice").unwrap();

    let err = vc.create_snapshot(&c.id, "not a", "b", meta()).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::IntegrityMismatch);
    assert_eq!(vc.history(&c.id).unwrap().len(), 1);
}

#[test]
fn test_create_snapshot_identical_texts_is_none() {
    let vc = controller();
    let c = vc.create_customization("a", "s", "alice").unwrap();

    assert!(vc.create_snapshot(&c.id, "a", "a", meta()).unwrap().is_none());
}

// ---------------------------------------------------------------------------
// apply_patch
// ---------------------------------------------------------------------------

#[test]
fn test_apply_patch_clean() {
    let vc = controller();
    let c = vc
        .create_customization("function f(){\n  return 1;\n}", "s", "alice")
        .unwrap();
    let patch = Patch::new(vec![PatchOp::replace(1, "  return 2;")]);

    let outcome = vc.apply_patch(&c.id, &patch, meta(), false).unwrap();

    assert!(outcome.changed);
    assert!(outcome.report.unwrap().is_clean());
    assert_eq!(
        vc.customization(&c.id).unwrap().current_text,
        "function f(){\n  return 2;\n}"
    );
}

#[test]
fn test_apply_patch_blocked_then_forced() {
    // GIVEN a patch writing twice to the same line (high severity)
    let vc = controller();
    let c = vc.create_customization("a\nb", "s", "alice").unwrap();
    let patch = Patch::new(vec![PatchOp::replace(0, "x"), PatchOp::replace(0, "y")]);

    // WHEN applied without force
    let err = vc.apply_patch(&c.id, &patch, meta(), false).unwrap_err();

    // THEN it is blocked and nothing changes
    assert_eq!(err.kind(), ExErrorKind::ConflictBlocked);
    assert_eq!(vc.customization(&c.id).unwrap().current_text, "a\nb");

    // WHEN forced
    let outcome = vc.apply_patch(&c.id, &patch, meta(), true).unwrap();

    // THEN it applies and the report travels with the outcome
    assert_eq!(outcome.report.unwrap().severity, Severity::High);
    assert_eq!(vc.customization(&c.id).unwrap().current_text, "y\nb");
}

#[test]
fn test_apply_patch_out_of_range_fails_with_op_index() {
    let vc = controller();
    let c = vc.create_customization("a\nb\nc", "s", "alice").unwrap();
    let patch = Patch::new(vec![PatchOp::remove(5)]);

    // Out-of-range addresses are critical, so force is needed to reach the patch model
    let err = vc.apply_patch(&c.id, &patch, meta(), true).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::PatchApplication);
    assert_eq!(err.op_index(), Some(0));
    assert!(err.request_id().is_some());
}

#[test]
fn test_apply_patch_respects_op_limit() {
    let mut config = EngineConfig::default();
    config.limits.max_patch_ops = 1;
    let vc = VersionController::new(Arc::new(MemoryLedgerStore::new()), config);
    let c = vc.create_customization("a", "s", "alice").unwrap();
    let patch = Patch::new(vec![PatchOp::append("b"), PatchOp::append("c")]);

    let err = vc.apply_patch(&c.id, &patch, meta(), false).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::InputTooLarge);
}

#[test]
fn test_analyze_does_not_write() {
    let vc = controller();
    let c = vc.create_customization("a", "s", "alice").unwrap();
    let patch = Patch::new(vec![PatchOp::remove(9)]);

    let report = vc.analyze(&c.id, &patch).unwrap();

    assert_eq!(report.severity, Severity::Critical);
    assert_eq!(vc.customization(&c.id).unwrap().revision, c.revision);
}

// ---------------------------------------------------------------------------
// archive / integrity / change log
// ---------------------------------------------------------------------------

#[test]
fn test_archive_seals_and_rejects_edits() {
    let vc = controller();
    let c = vc.create_customization("a", "s", "alice").unwrap();
    vc.apply_change(&c.id, "b", meta()).unwrap();

    let archived = vc.archive_customization(&c.id).unwrap();
    let again = vc.archive_customization(&c.id).unwrap();

    assert!(archived.is_archived());
    assert!(archived.open_snapshot_id.is_none());
    assert_eq!(again.revision, archived.revision);
    let err = vc.apply_change(&c.id, "c", meta()).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::IllegalState);
}

#[test]
fn test_verify_integrity_counts_snapshots() {
    let vc = controller();
    let c = vc.create_customization("a", "s", "alice").unwrap();
    vc.commit_change(&c.id, "a\nb", meta()).unwrap();
    vc.apply_change(&c.id, "a\nb\nc", meta()).unwrap();

    let report = vc.verify_integrity(&c.id).unwrap();

    assert_eq!(report.snapshots_verified, 3);
    assert_eq!(report.current_hash, vc.customization(&c.id).unwrap().current_hash);
}

#[test]
fn test_reconstruct_unknown_sequence() {
    let vc = controller();
    let c = vc.create_customization("a", "s", "alice").unwrap();

    let err = vc.reconstruct(&c.id, 7).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::SnapshotNotFound);
    assert_eq!(err.sequence(), Some(7));
}

#[test]
fn test_change_log_lines() {
    let vc = controller();
    let c = vc.create_customization("a", "s", "alice").unwrap();
    vc.commit_change(&c.id, "b", meta().with_summary("swap")).unwrap();

    let log = vc.change_log(&c.id).unwrap();

    assert_eq!(log.len(), 2);
    assert!(log[0].starts_with("#1 [initial/finalized]"));
    assert!(log[1].starts_with("#2 [manual/finalized]"));
    assert!(log[1].ends_with("by alice: swap"));
}
