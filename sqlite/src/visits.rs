//! The visits table.

use browser_history_core::{QueryOptions, SortOrder, Visit};
use rusqlite::{Connection, Row};

use crate::convert::{date_to_value, entry_from_row, visit_type_to_value};
use crate::error::{HistoryError, Result};
use crate::schema::{
    VISITS_COLUMNS, history_table_name, validate_prefix, visits_index_sql, visits_table_name,
};
use crate::table::{BoundStatement, Table, execute, execute_query};

/// One row per [`Visit`], pointing at its site through `siteId`.
///
/// The table stores only the site id; reads join the sites table so every
/// returned visit carries its full [`Site`](browser_history_core::Site).
/// Visits whose site row has gone missing are therefore never returned.
#[derive(Debug, Clone)]
pub struct VisitsTable {
    name: String,
    history: String,
}

impl VisitsTable {
    /// Creates the table descriptor for the given prefix.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidPrefix`] if the prefix is invalid.
    pub fn new(prefix: &str) -> Result<Self> {
        validate_prefix(prefix)?;
        Ok(Self {
            name: visits_table_name(prefix),
            history: history_table_name(prefix),
        })
    }

    /// Deletes every visit of the site with `site_id`.
    pub fn delete_for_site(&self, conn: &Connection, site_id: i64) -> Result<usize> {
        let stmt =
            BoundStatement::new(format!("DELETE FROM {} WHERE siteId = ?1", self.name)).bind(site_id);
        execute(conn, &self.name, &stmt)
    }

    /// Loads every visit of the site with `site_id`, newest first.
    pub fn for_site(&self, conn: &Connection, site_id: i64) -> Result<Vec<Visit>> {
        let stmt = BoundStatement::new(format!(
            "{} WHERE h.id = ?1 ORDER BY v.date DESC, v.id DESC",
            self.select()
        ))
        .bind(site_id);
        execute_query(conn, &stmt, Self::from_row)
    }

    /// Loads the visit with row id `id`, if it exists and its site is stored.
    pub fn find(&self, conn: &Connection, id: i64) -> Result<Option<Visit>> {
        let stmt = BoundStatement::new(format!("{} WHERE v.id = ?1", self.select())).bind(id);
        Ok(execute_query(conn, &stmt, Self::from_row)?.into_iter().next())
    }

    fn select(&self) -> String {
        format!(
            "SELECT h.id AS siteId, v.id AS visitId, h.url, h.title, h.guid, v.date, v.type \
             FROM {visits} v INNER JOIN {history} h ON h.id = v.siteId",
            visits = self.name,
            history = self.history
        )
    }
}

fn require_site_id(visit: &Visit) -> Result<i64> {
    visit.site.id.ok_or_else(|| {
        HistoryError::InvalidArgument(format!(
            "visit to {} has no stored site id",
            visit.site.url
        ))
    })
}

impl Table for VisitsTable {
    type Item = Visit;

    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &'static str {
        VISITS_COLUMNS
    }

    fn index_sql(&self, version: u32) -> Vec<String> {
        visits_index_sql(&self.name, version)
    }

    fn insert_statement(&self, visit: &mut Visit) -> Result<BoundStatement> {
        let site_id = require_site_id(visit)?;
        Ok(BoundStatement::new(format!(
            "INSERT INTO {} (siteId, date, type) VALUES (?1, ?2, ?3)",
            self.name
        ))
        .bind(site_id)
        .bind(date_to_value(&visit.date))
        .bind(visit_type_to_value(visit.visit_type)))
    }

    fn update_statement(&self, visit: &Visit) -> Result<BoundStatement> {
        let id = visit.id.ok_or_else(|| {
            HistoryError::InvalidArgument("cannot update a visit without an id".to_string())
        })?;
        Ok(BoundStatement::new(format!(
            "UPDATE {} SET date = ?1, type = ?2 WHERE id = ?3",
            self.name
        ))
        .bind(date_to_value(&visit.date))
        .bind(visit_type_to_value(visit.visit_type))
        .bind(id))
    }

    fn delete_statement(&self, visit: Option<&Visit>) -> Result<BoundStatement> {
        let Some(visit) = visit else {
            return Ok(BoundStatement::new(format!("DELETE FROM {}", self.name)));
        };
        if let Some(id) = visit.id {
            return Ok(
                BoundStatement::new(format!("DELETE FROM {} WHERE id = ?1", self.name)).bind(id),
            );
        }
        let site_id = require_site_id(visit)?;
        Ok(BoundStatement::new(format!(
            "DELETE FROM {} WHERE siteId = ?1 AND date = ?2",
            self.name
        ))
        .bind(site_id)
        .bind(date_to_value(&visit.date)))
    }

    fn query_statement(&self, options: Option<&QueryOptions>) -> BoundStatement {
        let filter = options.and_then(|o| o.filter.clone());
        let mut sql = self.select();
        if filter.is_some() {
            sql.push_str(" WHERE instr(h.url, ?1) > 0");
        }
        match options.and_then(|o| o.sort) {
            Some(SortOrder::LastVisit) => sql.push_str(" ORDER BY v.date DESC, v.id DESC"),
            None => sql.push_str(" ORDER BY v.id"),
        }
        let stmt = BoundStatement::new(sql);
        match filter {
            Some(filter) => stmt.bind(filter),
            None => stmt,
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Visit> {
        entry_from_row(row).map(|entry| entry.visit)
    }
}
