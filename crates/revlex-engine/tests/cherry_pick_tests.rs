//! Cherry-pick between customizations.

use std::sync::Arc;

use revlex_core::errors::ExErrorKind;
use revlex_core::ledger::{LedgerStore, MemoryLedgerStore};
use revlex_core::model::{ChangeKind, ChangeMeta, Customization, RollbackKind};
use revlex_engine::{EngineConfig, RollbackMode, RollbackRequest, VersionController};

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

/// Seven finalized versions: the baseline plus six edits
const VERSIONS: [&str; 7] = [
    "one\ntwo\nthree",
    "one\nTWO\nthree",
    "one\nTWO\nthree\nfour",
    "ONE\nTWO\nthree\nfour",
    "ONE\nTWO\nfour",
    "ONE\nTWO\nfour\nfive",
    "zero\nONE\nTWO\nfour\nfive",
];

fn setup() -> (
    Arc<MemoryLedgerStore>,
    VersionController<MemoryLedgerStore>,
    Customization,
) {
    let store = Arc::new(MemoryLedgerStore::new());
    let vc = VersionController::new(Arc::clone(&store), EngineConfig::default());
    let source = vc.create_customization(VERSIONS[0], "shop", "alice").unwrap();
    for text in &VERSIONS[1..] {
        vc.commit_change(&source.id, text, ChangeMeta::manual("alice")).unwrap();
    }
    (store, vc, source)
}

/// A branch of `source` holding the content of `sequence`
fn branch_at(
    vc: &VersionController<MemoryLedgerStore>,
    source: &Customization,
    sequence: u64,
) -> Customization {
    vc.rollback(&source.id, sequence, RollbackMode::Branch, RollbackRequest::new("bob"))
        .unwrap()
        .customization
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_cherry_pick_applies_in_ascending_order() {
    // GIVEN a target holding the source's content at sequence 2
    let (store, vc, source) = setup();
    let target = branch_at(&vc, &source, 2);

    // WHEN sequences 4 and 3 are picked (out of order)
    let result = vc.cherry_pick(&source.id, &[4, 3], &target.id, "carol").unwrap();

    // THEN they were applied ascending and the target reached sequence 4's content
    assert_eq!(result.applied_sequences, vec![3, 4]);
    assert_eq!(result.target.current_text, VERSIONS[3]);
    assert_eq!(vc.customization(&target.id).unwrap().current_text, VERSIONS[3]);

    // AND one cherry-pick snapshot plus one record were written
    assert_eq!(result.snapshot.kind, ChangeKind::CherryPick);
    assert_eq!(result.snapshot.sequence, 2);
    assert_eq!(vc.history(&target.id).unwrap().len(), 2);
    let records = store.list_rollback_records(&target.id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, RollbackKind::CherryPick);
    assert_eq!((records[0].from_seq, records[0].to_seq), (3, 4));
    assert_eq!(records[0].related_customization_id.as_deref(), Some(source.id.as_str()));
    vc.verify_integrity(&target.id).unwrap();
}

#[test]
fn test_cherry_pick_is_all_or_nothing() {
    // GIVEN a target at sequence 2, so 3 applies but 5 does not fit after it
    let (store, vc, source) = setup();
    let target = branch_at(&vc, &source, 2);

    // WHEN picking [3, 5, 7]
    let err = vc
        .cherry_pick(&source.id, &[3, 5, 7], &target.id, "carol")
        .unwrap_err();

    // THEN the failing sequence is reported
    assert_eq!(err.kind(), ExErrorKind::IntegrityMismatch);
    assert_eq!(err.sequence(), Some(5));

    // AND neither 3 nor 7 is visible in the target
    let stored = vc.customization(&target.id).unwrap();
    assert_eq!(stored.current_text, VERSIONS[1]);
    assert_eq!(stored.revision, target.revision);
    assert_eq!(vc.history(&target.id).unwrap().len(), 1);
    assert!(store.list_rollback_records(&target.id).unwrap().is_empty());
}

#[test]
fn test_cherry_pick_finalizes_open_target_snapshot() {
    let (_store, vc, source) = setup();
    let target = branch_at(&vc, &source, 1);
    // An open edit that leaves the text where sequence 2 expects it
    vc.apply_change(&target.id, "scratch", ChangeMeta::manual("carol"))
        .unwrap();
    vc.apply_change(&target.id, VERSIONS[0], ChangeMeta::manual("carol"))
        .unwrap();

    let result = vc.cherry_pick(&source.id, &[2], &target.id, "carol").unwrap();

    let history = vc.history(&target.id).unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|s| s.is_finalized()));
    assert_eq!(result.snapshot.sequence, 3);
    assert_eq!(result.target.current_text, VERSIONS[1]);
}

#[test]
fn test_cherry_pick_rejects_bad_sources() {
    let (_store, vc, source) = setup();
    let target = branch_at(&vc, &source, 2);

    let empty = vc.cherry_pick(&source.id, &[], &target.id, "carol").unwrap_err();
    let missing = vc
        .cherry_pick(&source.id, &[3, 40], &target.id, "carol")
        .unwrap_err();

    assert_eq!(empty.kind(), ExErrorKind::InvalidInput);
    assert_eq!(missing.kind(), ExErrorKind::SnapshotNotFound);
    assert_eq!(missing.sequence(), Some(40));
}

#[test]
fn test_cherry_pick_rejects_open_source_snapshot() {
    let (_store, vc, source) = setup();
    let target = branch_at(&vc, &source, 7);
    vc.apply_change(&source.id, "draft", ChangeMeta::manual("alice"))
        .unwrap();

    let err = vc.cherry_pick(&source.id, &[8], &target.id, "carol").unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::IllegalState);
    assert_eq!(vc.history(&target.id).unwrap().len(), 1);
}
