//! YAML configuration for opening a history database.
//!
//! ```yaml
//! database: history.db
//! table_prefix: browser_
//! schema_version: 2
//! ```
//!
//! Missing keys take their defaults; an empty file is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::migration::Migration;
use crate::schema::{CURRENT_SCHEMA_VERSION, check_version, validate_prefix};

/// Default table prefix.
pub const DEFAULT_PREFIX: &str = "browser_";

/// Where the history lives and which schema it uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file.
    pub database: PathBuf,
    /// Prefix for every table name.
    pub table_prefix: String,
    /// Schema version [`Migration::up_to`] creates or upgrades to.
    pub schema_version: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("history.db"),
            table_prefix: DEFAULT_PREFIX.to_string(),
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }
}

impl StoreConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&content)?
        };
        config.validate()?;
        debug!(path = %path.display(), database = %config.database.display(), "Loaded config");
        Ok(config)
    }

    /// Writes the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Checks the prefix and schema version.
    pub fn validate(&self) -> Result<()> {
        validate_prefix(&self.table_prefix)?;
        check_version(self.schema_version)
    }

    /// Opens the configured database file in WAL mode.
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.database)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Ok(conn)
    }

    /// Opens the database and wraps it in a [`Migration`] for this prefix.
    pub fn migration(&self) -> Result<Migration> {
        self.validate()?;
        Migration::new(self.open_connection()?, self.table_prefix.clone())
    }
}
