//! Core types shared across Revlex facilities
//!
//! This crate provides foundational types used by the error, logging and
//! ledger facilities:
//!
//! - **Identifiers**: prefixed UUIDv7 ids for customizations, snapshots and
//!   rollback records, plus a `RequestId` for correlating log events
//! - **Schema constants**: Canonical field keys and event names

pub mod ids;
pub mod schema;

pub use ids::{IdKind, RequestId};
