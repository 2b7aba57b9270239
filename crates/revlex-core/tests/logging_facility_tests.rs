#![allow(clippy::unwrap_used, clippy::expect_used)]

// The capture subscriber is shared by every test in this binary, so each
// test uses its own op name.

use revlex_core::errors::{ExError, ExErrorKind, RevlexError};
use revlex_core::logging_facility::init_test_capture;
use revlex_core::{log_op_end, log_op_error, log_op_start};
use revlex_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_start_carries_component_and_fields() {
    let capture = init_test_capture();
    let op = "start_fields_op";

    log_op_start!(op, customization_id = "cust:123", sequence = 4u64);

    let starts = capture.boundaries(op, EVENT_START);
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].field("component"), Some("logging_facility_tests"));
    assert!(starts[0].concerns("cust:123"));
    assert_eq!(starts[0].field("sequence"), Some("4"));
}

#[test]
fn test_end_records_duration() {
    let capture = init_test_capture();
    let op = "end_duration_op";

    log_op_end!(op, duration_ms = 42);

    let ends = capture.boundaries(op, EVENT_END);
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_error_from_domain_error_has_code_and_kind() {
    let capture = init_test_capture();
    let op = "domain_error_op";

    // GIVEN a domain error
    let err = RevlexError::SnapshotNotFound {
        snapshot_id: "snap:1".to_string(),
    };

    // WHEN it ends an operation
    log_op_error!(op, err, duration_ms = 10);

    // THEN the event is an error-level end_error with the stable code
    let errors = capture.boundaries(op, EVENT_END_ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].level, tracing::Level::ERROR);
    assert_eq!(errors[0].err_code(), Some("ERR_SNAPSHOT_NOT_FOUND"));
    assert_eq!(errors[0].field("err_kind"), Some("SnapshotNotFound"));
}

#[test]
fn test_error_from_ex_error_keeps_extra_fields() {
    let capture = init_test_capture();
    let op = "ex_error_op";

    let err = ExError::new(ExErrorKind::Concurrency).with_message("raced");
    log_op_error!(op, err, duration_ms = 1, customization_id = "cust:1");

    let event = capture
        .boundaries(op, EVENT_END_ERROR)
        .pop()
        .expect("end_error event");
    assert_eq!(event.err_code(), Some("ERR_CONCURRENCY"));
    assert_eq!(event.field("err_message"), Some("raced"));
    assert!(event.concerns("cust:1"));
}

#[test]
fn test_operations_are_kept_apart() {
    let capture = init_test_capture();

    log_op_start!("apart_apply_op");
    log_op_end!("apart_apply_op", duration_ms = 10);
    log_op_start!("apart_finalize_op");

    let apply: Vec<_> = capture
        .for_op("apart_apply_op")
        .iter()
        .filter_map(|e| e.event().map(str::to_string))
        .collect();
    assert_eq!(apply, vec![EVENT_START, EVENT_END]);
    assert_eq!(capture.for_op("apart_finalize_op").len(), 1);
}

#[test]
#[should_panic(expected = "no start event for op never_logged_op")]
fn test_assert_boundary_panics_when_missing() {
    init_test_capture().assert_boundary("never_logged_op", EVENT_START);
}
