//! SQL schema definitions with customizable table prefixes.
//!
//! All table and index names are prefixed with a configurable string to
//! allow multiple isolated history sets in the same database.
//!
//! # Table structure
//!
//! - `{prefix}history`: one row per site, unique by `url` and by `guid`
//! - `{prefix}visits`: one row per visit, pointing at a site via `siteId`
//! - `{prefix}schema_version`: single-row version record kept by
//!   [`Migration`](crate::Migration)
//!
//! `visits.siteId` deliberately carries no `FOREIGN KEY` clause: referential
//! integrity between the two tables is enforced by
//! [`HistoryVisitsStore`](crate::HistoryVisitsStore).
//!
//! # Versions
//!
//! - **1**: base tables.
//! - **2**: adds `siteId` and `date` indexes on the visits table.

use crate::error::{HistoryError, Result};

/// Schema version written by a fresh [`Migration::up`](crate::Migration::up).
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

pub(crate) const HISTORY_COLUMNS: &str = "id INTEGER PRIMARY KEY AUTOINCREMENT, \
     guid TEXT NOT NULL UNIQUE, \
     url TEXT NOT NULL UNIQUE, \
     title TEXT NOT NULL";

pub(crate) const VISITS_COLUMNS: &str = "id INTEGER PRIMARY KEY AUTOINCREMENT, \
     siteId INTEGER NOT NULL, \
     date INTEGER NOT NULL, \
     type INTEGER NOT NULL";

/// Validates that a table prefix contains only alphanumeric characters and underscores.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(HistoryError::InvalidPrefix(prefix.to_string()));
    }
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(HistoryError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// Rejects schema versions this crate does not know how to build.
pub(crate) fn check_version(version: u32) -> Result<()> {
    if version == 0 || version > CURRENT_SCHEMA_VERSION {
        return Err(HistoryError::MigrationError(format!(
            "unsupported schema version {version} (supported: 1..={CURRENT_SCHEMA_VERSION})"
        )));
    }
    Ok(())
}

pub(crate) fn history_table_name(prefix: &str) -> String {
    format!("{prefix}history")
}

pub(crate) fn visits_table_name(prefix: &str) -> String {
    format!("{prefix}visits")
}

pub(crate) fn version_table_name(prefix: &str) -> String {
    format!("{prefix}schema_version")
}

/// Index statements the visits table carries at `version`.
pub(crate) fn visits_index_sql(visits: &str, version: u32) -> Vec<String> {
    if version < 2 {
        return Vec::new();
    }
    vec![
        format!("CREATE INDEX IF NOT EXISTS idx_{visits}_site ON {visits}(siteId)"),
        format!("CREATE INDEX IF NOT EXISTS idx_{visits}_date ON {visits}(date)"),
    ]
}

/// Generates SQL to drop every table owned by the given prefix.
///
/// # Errors
///
/// Returns [`HistoryError::InvalidPrefix`] if the prefix is invalid.
pub fn generate_drop_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    Ok(format!(
        r#"
DROP TABLE IF EXISTS {visits};
DROP TABLE IF EXISTS {history};
DROP TABLE IF EXISTS {version};
"#,
        visits = visits_table_name(prefix),
        history = history_table_name(prefix),
        version = version_table_name(prefix),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_prefix() {
        assert!(validate_prefix("browser_").is_ok());
        assert!(validate_prefix("test123").is_ok());
        assert!(validate_prefix("A_B_C").is_ok());
    }

    #[test]
    fn test_invalid_prefix() {
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("drop;--").is_err());
        assert!(validate_prefix("hello world").is_err());
        assert!(validate_prefix("test-prefix").is_err());
    }

    #[test]
    fn test_check_version_bounds() {
        assert!(check_version(0).is_err());
        assert!(check_version(1).is_ok());
        assert!(check_version(CURRENT_SCHEMA_VERSION).is_ok());
        assert!(check_version(CURRENT_SCHEMA_VERSION + 1).is_err());
    }

    #[test]
    fn test_visits_indexes_arrive_in_version_two() {
        assert!(visits_index_sql("b_visits", 1).is_empty());
        let sql = visits_index_sql("b_visits", 2);
        assert_eq!(sql.len(), 2);
        assert!(sql[0].contains("idx_b_visits_site"));
        assert!(sql[1].contains("idx_b_visits_date"));
    }

    #[test]
    fn test_visits_columns_have_no_foreign_key() {
        assert!(!VISITS_COLUMNS.contains("REFERENCES"));
        assert!(HISTORY_COLUMNS.contains("url TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn test_generate_drop_sql_contains_all_tables() {
        let sql = generate_drop_sql("b_").unwrap();
        assert!(sql.contains("DROP TABLE IF EXISTS b_visits"));
        assert!(sql.contains("DROP TABLE IF EXISTS b_history"));
        assert!(sql.contains("DROP TABLE IF EXISTS b_schema_version"));
        assert!(generate_drop_sql("").is_err());
    }
}
