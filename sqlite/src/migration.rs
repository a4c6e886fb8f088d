//! Migration lifecycle operations for the history schema.
//!
//! Provides [`Migration`] for creating, upgrading and dropping the sites and
//! visits tables. The schema version is recorded in a
//! `{prefix}schema_version` table next to them. All mutation operations use
//! transactions to ensure atomicity.
//!
//! # Example
//!
//! ```no_run
//! use browser_history_sqlite::Migration;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("history.db").unwrap();
//! let mut migration = Migration::new(conn, "browser_").unwrap();
//!
//! // Create tables at the current schema version
//! migration.up().unwrap();
//!
//! // Check status
//! let status = migration.status().unwrap();
//! assert!(status.tables_exist);
//! println!("Sites: {}, visits: {}", status.site_count, status.visit_count);
//! ```

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{HistoryError, Result};
use crate::schema::{
    CURRENT_SCHEMA_VERSION, check_version, generate_drop_sql, history_table_name,
    version_table_name,
};
use crate::store::HistoryVisitsStore;

/// Manages the lifecycle of the history tables.
///
/// Provides operations to create tables ([`up`](Self::up)), migrate them to
/// a newer schema version ([`upgrade`](Self::upgrade)), drop them
/// ([`down`](Self::down)), and check the current state
/// ([`status`](Self::status)).
///
/// The migration owns its connection; use [`connection`](Self::connection)
/// together with [`store`](Self::store) to work with the data afterwards.
pub struct Migration {
    conn: Connection,
    prefix: String,
    store: HistoryVisitsStore,
}

impl Migration {
    /// Creates a new migration manager for the given connection and table prefix.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidPrefix`] if the prefix contains invalid characters.
    pub fn new(conn: Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        let store = HistoryVisitsStore::new(prefix.clone())?;
        Ok(Self {
            conn,
            prefix,
            store,
        })
    }

    /// Creates the tables at [`CURRENT_SCHEMA_VERSION`], or upgrades existing
    /// ones to it.
    pub fn up(&mut self) -> Result<u32> {
        self.up_to(CURRENT_SCHEMA_VERSION)
    }

    /// Creates the tables at `version`, or upgrades existing ones to it.
    ///
    /// Safe to call repeatedly. Existing tables at a newer version than
    /// `version` are left untouched.
    pub fn up_to(&mut self, version: u32) -> Result<u32> {
        check_version(version)?;
        match self.schema_version()? {
            None => {
                let tx = self.conn.transaction()?;
                self.store.create(&tx, version)?;
                write_version(&tx, &self.prefix, version)?;
                tx.commit()?;
                info!(prefix = %self.prefix, version, "Created history tables");
                Ok(version)
            }
            Some(current) if current < version => self.upgrade(version),
            Some(current) => Ok(current),
        }
    }

    /// Migrates existing tables from their recorded version to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::MigrationError`] if the tables have not been
    /// created or `to` is older than the recorded version.
    pub fn upgrade(&mut self, to: u32) -> Result<u32> {
        let from = self.schema_version()?.ok_or_else(|| {
            HistoryError::MigrationError("history tables have not been created".to_string())
        })?;
        if from == to {
            return Ok(to);
        }
        let tx = self.conn.transaction()?;
        self.store.update_table(&tx, from, to)?;
        write_version(&tx, &self.prefix, to)?;
        tx.commit()?;
        info!(prefix = %self.prefix, from, to, "Upgraded history tables");
        Ok(to)
    }

    /// Drops all history tables.
    ///
    /// Uses `DROP TABLE IF EXISTS` so it is safe to call even if tables
    /// do not exist. Executes within a transaction for atomicity.
    pub fn down(&mut self) -> Result<()> {
        let sql = generate_drop_sql(&self.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| HistoryError::MigrationError(format!("failed to drop tables: {e}")))?;
        tx.commit()?;
        info!(prefix = %self.prefix, "Dropped history tables");
        Ok(())
    }

    /// Returns the current status of the migration.
    pub fn status(&self) -> Result<MigrationStatus> {
        if !self.table_exists(&history_table_name(&self.prefix))? {
            return Ok(MigrationStatus::default());
        }

        Ok(MigrationStatus {
            tables_exist: true,
            schema_version: self.schema_version()?,
            site_count: self.store.count_sites(&self.conn)?,
            visit_count: self.store.count_visits(&self.conn)?,
        })
    }

    /// Returns the recorded schema version, or `None` before [`up`](Self::up).
    pub fn schema_version(&self) -> Result<Option<u32>> {
        let table = version_table_name(&self.prefix);
        if !self.table_exists(&table)? {
            return Ok(None);
        }
        let version: Option<i64> = self
            .conn
            .query_row(&format!("SELECT version FROM {table} LIMIT 1"), [], |row| {
                row.get(0)
            })
            .optional()?;
        version
            .map(|v| {
                u32::try_from(v).map_err(|_| {
                    HistoryError::MigrationError(format!("invalid recorded schema version {v}"))
                })
            })
            .transpose()
    }

    /// The store operating on this migration's tables.
    pub fn store(&self) -> &HistoryVisitsStore {
        &self.store
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the migration and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

fn write_version(conn: &Connection, prefix: &str, version: u32) -> Result<()> {
    let table = version_table_name(prefix);
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (version INTEGER NOT NULL); DELETE FROM {table};"
    ))?;
    conn.execute(&format!("INSERT INTO {table} (version) VALUES (?1)"), [version])?;
    Ok(())
}

/// Snapshot returned by [`Migration::status`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Whether the sites table exists.
    pub tables_exist: bool,
    /// Recorded schema version, if any.
    pub schema_version: Option<u32>,
    /// Number of sites stored.
    pub site_count: usize,
    /// Number of visits stored.
    pub visit_count: usize,
}
