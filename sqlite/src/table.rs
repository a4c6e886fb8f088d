//! Single-table CRUD primitive.
//!
//! A [`Table`] knows its column layout, how to turn one item into a bound
//! insert/update/delete/select statement, and how to turn a result row back
//! into an item. The provided methods execute those statements against a
//! caller-supplied [`Connection`]; implementors only describe SQL.
//!
//! [`HistoryTable`](crate::HistoryTable) and
//! [`VisitsTable`](crate::VisitsTable) are the two implementations;
//! [`HistoryVisitsStore`](crate::HistoryVisitsStore) coordinates them.

use browser_history_core::QueryOptions;
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params_from_iter};
use tracing::debug;

use crate::error::{HistoryError, Result};
use crate::schema::check_version;

/// A SQL statement together with its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl BoundStatement {
    /// A statement with no arguments.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// Appends the next positional argument.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }
}

/// Runs a bound query and converts every row with `factory`.
///
/// This is the escape hatch used for statements that span more than one
/// table, such as the joined history view.
pub fn execute_query<T, F>(conn: &Connection, stmt: &BoundStatement, factory: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    debug!(sql = %stmt.sql, args = stmt.args.len(), "Executing query");
    let mut prepared = conn.prepare(&stmt.sql)?;
    let rows = prepared
        .query_map(params_from_iter(stmt.args.iter()), factory)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn execute(conn: &Connection, table: &str, stmt: &BoundStatement) -> Result<usize> {
    debug!(table, sql = %stmt.sql, "Executing statement");
    Ok(conn.execute(&stmt.sql, params_from_iter(stmt.args.iter()))?)
}

/// Storage description of one entity type.
pub trait Table {
    /// The entity stored in this table.
    type Item;

    /// Fully prefixed table name.
    fn name(&self) -> &str;

    /// Column definitions used inside `CREATE TABLE`.
    fn columns(&self) -> &'static str;

    /// Extra statements (indexes) the table carries at `version`.
    fn index_sql(&self, _version: u32) -> Vec<String> {
        Vec::new()
    }

    /// Builds the insert for `item`, filling in any values generated on first
    /// insert.
    fn insert_statement(&self, item: &mut Self::Item) -> Result<BoundStatement>;

    /// Builds the update for `item`.
    fn update_statement(&self, item: &Self::Item) -> Result<BoundStatement>;

    /// Builds the delete for `item`, or for every row when `None`.
    fn delete_statement(&self, item: Option<&Self::Item>) -> Result<BoundStatement>;

    /// Builds the select for `options`.
    fn query_statement(&self, options: Option<&QueryOptions>) -> BoundStatement;

    /// Converts one result row of [`query_statement`](Self::query_statement).
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self::Item>;

    /// Creates the table (and its indexes) at `version`.
    fn create(&self, conn: &Connection, version: u32) -> Result<()> {
        check_version(version)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name(),
            self.columns()
        ))
        .map_err(|e| {
            HistoryError::MigrationError(format!("failed to create {}: {e}", self.name()))
        })?;
        for sql in self.index_sql(version) {
            conn.execute_batch(&sql)?;
        }
        debug!(table = self.name(), version, "Created table");
        Ok(())
    }

    /// Brings an existing table from schema version `from` to `to`.
    ///
    /// Downgrades are rejected; upgrading to the same version is a no-op.
    fn update_table(&self, conn: &Connection, from: u32, to: u32) -> Result<()> {
        check_version(from)?;
        check_version(to)?;
        if to < from {
            return Err(HistoryError::MigrationError(format!(
                "cannot downgrade {} from version {from} to {to}",
                self.name()
            )));
        }
        let before: Vec<String> = self.index_sql(from);
        for sql in self.index_sql(to) {
            if !before.contains(&sql) {
                conn.execute_batch(&sql)?;
            }
        }
        debug!(table = self.name(), from, to, "Updated table");
        Ok(())
    }

    /// Drops the table if it exists.
    fn drop_table(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", self.name()))?;
        Ok(())
    }

    /// Inserts `item` and returns the new row id.
    fn insert(&self, conn: &Connection, item: &mut Self::Item) -> Result<i64> {
        let stmt = self.insert_statement(item)?;
        execute(conn, self.name(), &stmt)?;
        Ok(conn.last_insert_rowid())
    }

    /// Updates `item` and returns the number of affected rows.
    fn update(&self, conn: &Connection, item: &Self::Item) -> Result<usize> {
        let stmt = self.update_statement(item)?;
        execute(conn, self.name(), &stmt)
    }

    /// Deletes `item` (or everything, for `None`) and returns the number of
    /// affected rows.
    fn delete(&self, conn: &Connection, item: Option<&Self::Item>) -> Result<usize> {
        let stmt = self.delete_statement(item)?;
        execute(conn, self.name(), &stmt)
    }

    /// Loads every item matching `options`.
    fn query(&self, conn: &Connection, options: Option<&QueryOptions>) -> Result<Vec<Self::Item>> {
        execute_query(conn, &self.query_statement(options), Self::from_row)
    }

    /// Counts the rows in the table.
    fn count(&self, conn: &Connection) -> Result<usize> {
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.name()), [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_statement_collects_args_in_order() {
        let stmt = BoundStatement::new("SELECT ?1, ?2")
            .bind(7_i64)
            .bind("title".to_string());
        assert_eq!(
            stmt.args,
            vec![Value::Integer(7), Value::Text("title".to_string())]
        );
    }

    #[test]
    fn test_execute_query_binds_args() {
        let conn = Connection::open_in_memory().unwrap();
        let stmt = BoundStatement::new("SELECT ?1 + ?2").bind(2_i64).bind(3_i64);
        let rows = execute_query(&conn, &stmt, |row| row.get::<_, i64>(0)).unwrap();
        assert_eq!(rows, vec![5]);
    }
}
