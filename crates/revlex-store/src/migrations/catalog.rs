//! The ledger schema, embedded at compile time.

use revlex_core::document::content_hash;

/// One schema step. `id` sorts in application order.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

impl Migration {
    /// Recorded in `schema_version`; a mismatch on reopen means the SQL of an
    /// applied step was edited after the fact.
    pub fn checksum(&self) -> String {
        content_hash(self.sql)
    }
}

pub const LEDGER_MIGRATIONS: &[Migration] = &[
    Migration {
        id: "001_initial_schema",
        sql: include_str!("../../migrations/001_initial_schema.sql"),
    },
    Migration {
        id: "002_rollback_records",
        sql: include_str!("../../migrations/002_rollback_records.sql"),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_ordered_and_distinct() {
        let ids: Vec<_> = LEDGER_MIGRATIONS.iter().map(|m| m.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);

        let first = LEDGER_MIGRATIONS[0].checksum();
        assert_eq!(first.len(), 64);
        assert_ne!(first, LEDGER_MIGRATIONS[1].checksum());
    }
}
