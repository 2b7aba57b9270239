use revlex_core::errors::{ExError, ExErrorKind, PatchFailure, RevlexError};

#[test]
fn test_customization_not_found_verifiable_by_kind() {
    let err = RevlexError::CustomizationNotFound {
        customization_id: "cust:unknown".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::NotFound);
    assert_eq!(ex_err.code(), "ERR_NOT_FOUND");
    assert_eq!(ex_err.customization_id(), Some("cust:unknown"));
}

#[test]
fn test_patch_application_carries_failed_op_index() {
    let err = RevlexError::PatchApplication {
        failed_op_index: 2,
        reason: PatchFailure::IndexOutOfRange { index: 5, len: 3 },
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::PatchApplication);
    assert_eq!(ex_err.op_index(), Some(2));
    assert!(ex_err.message().contains("index 5 out of range"));
}

#[test]
fn test_malformed_distinct_from_application_failure() {
    let malformed: ExError = RevlexError::MalformedPatch {
        op_index: 0,
        reason: "missing value".to_string(),
    }
    .into();
    let failed: ExError = RevlexError::PatchApplication {
        failed_op_index: 0,
        reason: PatchFailure::TestFailed {
            index: 0,
            expected: "a".to_string(),
            actual: "b".to_string(),
        },
    }
    .into();

    assert_eq!(malformed.kind(), ExErrorKind::MalformedPatch);
    assert_ne!(malformed.kind(), failed.kind());
}

#[test]
fn test_lifecycle_errors_are_illegal_state() {
    for err in [
        RevlexError::SnapshotFinalized {
            snapshot_id: "snap:1".to_string(),
        },
        RevlexError::SnapshotNotFinalized {
            snapshot_id: "snap:1".to_string(),
        },
        RevlexError::CustomizationArchived {
            customization_id: "cust:1".to_string(),
        },
    ] {
        let ex_err: ExError = err.into();
        assert_eq!(ex_err.kind(), ExErrorKind::IllegalState);
    }
}

#[test]
fn test_concurrency_is_the_only_retryable_kind() {
    let ex_err: ExError = RevlexError::ConcurrentModification {
        customization_id: "cust:1".to_string(),
        sequence: 4,
    }
    .into();

    assert!(ex_err.kind().is_retryable());
    assert_eq!(ex_err.sequence(), Some(4));
    assert!(!ExErrorKind::IntegrityMismatch.is_retryable());
    assert!(!ExErrorKind::Persistence.is_retryable());
}

#[test]
fn test_error_kind_code_mapping() {
    let kinds = vec![
        (ExErrorKind::InvalidInput, "ERR_INVALID_INPUT"),
        (ExErrorKind::MalformedPatch, "ERR_MALFORMED_PATCH"),
        (ExErrorKind::PatchApplication, "ERR_PATCH_APPLICATION"),
        (ExErrorKind::DeltaApplication, "ERR_DELTA_APPLICATION"),
        (ExErrorKind::IntegrityMismatch, "ERR_INTEGRITY_MISMATCH"),
        (ExErrorKind::RollbackTargetNotFound, "ERR_ROLLBACK_TARGET_NOT_FOUND"),
        (ExErrorKind::Concurrency, "ERR_CONCURRENCY"),
    ];

    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
    }
}

#[test]
fn test_display_includes_context_and_cause() {
    let cause = ExError::new(ExErrorKind::Persistence).with_message("disk full");
    let err = ExError::new(ExErrorKind::Internal)
        .with_op("rollback")
        .with_customization_id("cust:1")
        .with_sequence(3)
        .with_message("commit failed")
        .with_source(cause);

    let text = err.to_string();
    assert!(text.starts_with("[ERR_INTERNAL] in operation 'rollback': commit failed"));
    assert!(text.contains("(customization_id: cust:1)"));
    assert!(text.contains("(sequence: 3)"));
    assert!(text.contains("caused by [ERR_PERSISTENCE]: disk full"));
    assert!(std::error::Error::source(&err).is_some());
}
