//! `SQLite` schema definitions for studentcard.
//!
//! The database holds a handful of named slots, each one JSON document. The
//! student record lives in a single slot.

/// SQL statement to create the slots table.
///
/// `updated_at` holds the RFC 3339 time of the last write.
pub const CREATE_SLOTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS slots (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_SLOTS_TABLE, CREATE_METADATA_TABLE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_create_slots_table_columns() {
        assert!(CREATE_SLOTS_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_SLOTS_TABLE.contains("value TEXT NOT NULL"));
        assert!(CREATE_SLOTS_TABLE.contains("updated_at TEXT NOT NULL"));
    }
}
