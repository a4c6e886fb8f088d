//! SQLite storage for browsing history.
//!
//! This crate stores [`Site`](browser_history_core::Site)s and
//! [`Visit`](browser_history_core::Visit)s in two tables and keeps them
//! consistent in application code, without SQL foreign keys. It includes
//! migration lifecycle management, YAML configuration, and a joined query
//! that presents each site with its most recent visit.
//!
//! # Architecture
//!
//! - **`table`**: the [`Table`] CRUD primitive; each table describes its SQL and
//!   the trait executes it
//! - **`history`** / **`visits`**: the two [`Table`] implementations
//! - **`store`**: [`HistoryVisitsStore`], which coordinates both tables and
//!   enforces referential integrity inside transactions
//! - **`migration`**: lifecycle operations (up/upgrade/down/status)
//! - **`config`**: [`StoreConfig`], loaded from YAML
//!
//! # Quick start
//!
//! ```no_run
//! use browser_history_core::{HistoryItem, Site, Visit};
//! use browser_history_sqlite::{Migration, StoreConfig};
//!
//! let config = StoreConfig::load("history.yaml").unwrap();
//! let mut migration = config.migration().unwrap();
//! migration.up_to(config.schema_version).unwrap();
//!
//! let store = migration.store();
//! let conn = migration.connection();
//! let mut item = HistoryItem::visit(Visit::now(Site::new("https://example.com/", "Example")));
//! store.insert(conn, &mut item).unwrap();
//!
//! for entry in store.query(conn, None).unwrap() {
//!     println!("{} {}", entry.visit.date, entry.site.url);
//! }
//! ```
//!
//! # Table prefix customization
//!
//! All table and index names are prefixed with a configurable string,
//! allowing multiple isolated histories within the same SQLite database.
//! Prefixes must contain only alphanumeric characters and underscores.

mod config;
mod convert;
mod error;
mod history;
mod migration;
mod schema;
mod store;
mod table;
mod visits;

pub use config::{DEFAULT_PREFIX, StoreConfig};
pub use error::{HistoryError, Result};
pub use history::HistoryTable;
pub use migration::{Migration, MigrationStatus};
pub use schema::{CURRENT_SCHEMA_VERSION, generate_drop_sql};
pub use store::HistoryVisitsStore;
pub use table::{BoundStatement, Table, execute_query};
pub use visits::VisitsTable;
