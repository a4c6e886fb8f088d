//! The joined history/visits store.
//!
//! [`HistoryVisitsStore`] is not a table of its own. It presents the sites
//! table and the visits table as one entity, [`HistoryItem`], and keeps them
//! consistent without SQL foreign keys:
//!
//! 1. Recording a visit makes sure its site exists first, deduplicating by
//!    url, so repeated visits never create a second site row.
//! 2. Deleting a site also deletes every visit to it.
//! 3. Updates only touch visit-level fields.
//!
//! Every multi-statement write runs in one transaction and is rolled back as
//! a whole when any step fails. If the caller already has a transaction open
//! on the connection, the store joins it instead of opening its own.
//!
//! # Example
//!
//! ```
//! use browser_history_core::{HistoryItem, QueryOptions, Site, SortOrder, Visit, VisitType};
//! use browser_history_sqlite::HistoryVisitsStore;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open_in_memory().unwrap();
//! let store = HistoryVisitsStore::new("browser_").unwrap();
//! store.create(&conn, 2).unwrap();
//!
//! let visit = Visit::now(Site::new("https://example.com/", "Example")).with_type(VisitType::Typed);
//! let mut item = HistoryItem::visit(visit);
//! store.insert(&conn, &mut item).unwrap();
//!
//! let opts = QueryOptions::default().with_filter("example").sorted(SortOrder::LastVisit);
//! let entries = store.query(&conn, Some(&opts)).unwrap();
//! assert_eq!(entries.len(), 1);
//! assert_eq!(entries[0].visit.visit_type, VisitType::Typed);
//! ```

use browser_history_core::{
    HistoryEntry, HistoryItem, QueryOptions, Site, SortOrder, ValidationError, Visit,
    validate_item, validate_site, validate_visit,
};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::convert::entry_from_row;
use crate::error::{HistoryError, Result};
use crate::history::HistoryTable;
use crate::table::{BoundStatement, Table, execute_query};
use crate::visits::VisitsTable;

/// Coordinates [`HistoryTable`] and [`VisitsTable`] as one logical entity.
///
/// The store holds no connection and no state beyond the two table names;
/// every operation runs against the connection it is handed.
#[derive(Debug, Clone)]
pub struct HistoryVisitsStore {
    history: HistoryTable,
    visits: VisitsTable,
}

impl HistoryVisitsStore {
    /// Name of the joined view.
    pub const NAME: &'static str = "history-visits";

    /// Creates a store over the tables named by `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidPrefix`] if the prefix is invalid.
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        Ok(Self {
            history: HistoryTable::new(&prefix)?,
            visits: VisitsTable::new(&prefix)?,
        })
    }

    /// The sites table.
    pub fn history(&self) -> &HistoryTable {
        &self.history
    }

    /// The visits table.
    pub fn visits(&self) -> &VisitsTable {
        &self.visits
    }

    /// Creates the sites table, then the visits table, at `version`.
    pub fn create(&self, conn: &Connection, version: u32) -> Result<()> {
        in_transaction(conn, "create", |tx| {
            self.history.create(tx, version)?;
            self.visits.create(tx, version)
        })
    }

    /// Migrates both tables from schema version `from` to `to`.
    pub fn update_table(&self, conn: &Connection, from: u32, to: u32) -> Result<()> {
        in_transaction(conn, "update_table", |tx| {
            self.history.update_table(tx, from, to)?;
            self.visits.update_table(tx, from, to)
        })
    }

    /// Finds the stored id of the site with `site.url`.
    ///
    /// Resolution uses an exact url match and succeeds only when exactly one
    /// row matches; anything else is reported as `None`.
    pub fn resolve_site_id(&self, conn: &Connection, site: &Site) -> Result<Option<i64>> {
        let matches = self.history.find_by_url(conn, &site.url)?;
        match matches.as_slice() {
            [found] => Ok(found.id),
            _ => {
                debug!(url = %site.url, matches = matches.len(), "Site identity not resolved");
                Ok(None)
            }
        }
    }

    /// Writes `item` and returns the id of the visit it produced.
    ///
    /// - With a visit: the visit's site is upserted by url, then the visit
    ///   is inserted against the resolved site id.
    /// - With only a site: the site is upserted and a visit of
    ///   [`VisitType::Unknown`](browser_history_core::VisitType::Unknown)
    ///   stamped with the current time is recorded for it. Use
    ///   [`record_site`](Self::record_site) to store a site without a visit.
    ///
    /// Site and visit ids (and a generated guid) are written back into
    /// `item`.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidArgument`] if `item` carries neither a
    /// site nor a visit, or if the url is unusable.
    pub fn insert(&self, conn: &Connection, item: &mut HistoryItem) -> Result<i64> {
        check(validate_item(item))?;
        if let Some(visit) = item.visit.as_mut() {
            return in_transaction(conn, "insert", |tx| self.insert_visit(tx, visit));
        }
        let Some(site) = item.site.as_mut() else {
            return Err(invalid(ValidationError::EmptyItem));
        };
        in_transaction(conn, "insert", |tx| {
            self.upsert_site(tx, site)?;
            let mut visit = Visit::now(site.clone());
            self.insert_visit(tx, &mut visit)
        })
    }

    /// Stores or refreshes `site` without recording a visit; returns its id.
    pub fn record_site(&self, conn: &Connection, site: &mut Site) -> Result<i64> {
        check(validate_site(site))?;
        in_transaction(conn, "record_site", |tx| self.upsert_site(tx, site))
    }

    /// Records `visit`, upserting its site first; returns the visit id.
    pub fn record_visit(&self, conn: &Connection, visit: &mut Visit) -> Result<i64> {
        check(validate_visit(visit))?;
        in_transaction(conn, "record_visit", |tx| self.insert_visit(tx, visit))
    }

    /// Updates the visit carried by `item`; site titles are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidArgument`] if `item` has no visit or
    /// the visit has no id.
    pub fn update(&self, conn: &Connection, item: &HistoryItem) -> Result<usize> {
        let visit = item.visit.as_ref().ok_or_else(|| {
            HistoryError::InvalidArgument("update requires a visit".to_string())
        })?;
        self.visits.update(conn, visit)
    }

    /// Deletes history.
    ///
    /// - `Some` item with a visit: deletes that visit only; returns 0 or 1.
    /// - `Some` item with only a site: deletes every visit to the site, then
    ///   the site row itself; returns the number of site rows removed.
    /// - `None`: deletes all sites and then all visits; returns the number
    ///   of visits removed.
    pub fn delete(&self, conn: &Connection, item: Option<&HistoryItem>) -> Result<usize> {
        let Some(item) = item else {
            return in_transaction(conn, "delete_all", |tx| {
                let sites = self.history.delete(tx, None)?;
                let visits = self.visits.delete(tx, None)?;
                info!(sites, visits, "Cleared history");
                Ok(visits)
            });
        };
        if let Some(visit) = &item.visit {
            return self.delete_visit(conn, visit);
        }
        let Some(site) = &item.site else {
            return Err(invalid(ValidationError::EmptyItem));
        };
        in_transaction(conn, "delete_site", |tx| {
            if let Some(site_id) = self.resolve_site_id(tx, site)? {
                let visits = self.visits.delete_for_site(tx, site_id)?;
                debug!(url = %site.url, site_id, visits, "Deleted visits for site");
            }
            self.history.delete(tx, Some(site))
        })
    }

    /// Loads the joined view: one row per site, carrying its most recent
    /// visit.
    ///
    /// `options.filter` keeps sites whose url contains the filter;
    /// [`SortOrder::LastVisit`] orders rows by that most recent visit, newest
    /// first. Without a sort, rows come back in site id order.
    pub fn query(
        &self,
        conn: &Connection,
        options: Option<&QueryOptions>,
    ) -> Result<Vec<HistoryEntry>> {
        execute_query(conn, &self.joined_statement(options), entry_from_row)
    }

    /// Loads plain sites matching `options`.
    pub fn query_sites(&self, conn: &Connection, options: Option<&QueryOptions>) -> Result<Vec<Site>> {
        self.history.query(conn, options)
    }

    /// Loads every visit to the site with `site.url`, newest first.
    pub fn visits_for_site(&self, conn: &Connection, site: &Site) -> Result<Vec<Visit>> {
        match self.resolve_site_id(conn, site)? {
            Some(site_id) => self.visits.for_site(conn, site_id),
            None => Ok(Vec::new()),
        }
    }

    /// Number of stored sites.
    pub fn count_sites(&self, conn: &Connection) -> Result<usize> {
        self.history.count(conn)
    }

    /// Number of stored visits.
    pub fn count_visits(&self, conn: &Connection) -> Result<usize> {
        self.visits.count(conn)
    }

    /// Stores `site` keyed by its url; any id the caller set is replaced by
    /// the id of the row that carries the url.
    fn upsert_site(&self, conn: &Connection, site: &mut Site) -> Result<i64> {
        if let Some(id) = self.resolve_site_id(conn, site)? {
            if site.id.is_some_and(|given| given != id) {
                debug!(url = %site.url, given = ?site.id, id, "Replacing caller site id");
            }
            site.id = Some(id);
            self.history.update(conn, site)?;
            return Ok(id);
        }

        site.id = None;
        let id = self.history.insert(conn, site)?;
        site.id = Some(id);
        debug!(url = %site.url, id, "Inserted site");
        Ok(id)
    }

    fn insert_visit(&self, conn: &Connection, visit: &mut Visit) -> Result<i64> {
        self.upsert_site(conn, &mut visit.site)?;
        let id = self.visits.insert(conn, visit)?;
        visit.id = Some(id);
        Ok(id)
    }

    fn delete_visit(&self, conn: &Connection, visit: &Visit) -> Result<usize> {
        if visit.id.is_some() {
            return self.visits.delete(conn, Some(visit));
        }
        let Some(site_id) = self.resolve_site_id(conn, &visit.site)? else {
            return Ok(0);
        };
        let mut target = visit.clone();
        target.site.id = Some(site_id);
        self.visits.delete(conn, Some(&target))
    }

    fn joined_statement(&self, options: Option<&QueryOptions>) -> BoundStatement {
        let history = self.history.name();
        let visits = self.visits.name();
        let mut sql = format!(
            "SELECT {history}.id AS siteId, {visits}.id AS visitId, url, title, guid, date, type \
             FROM {visits} INNER JOIN {history} ON {history}.id = {visits}.siteId \
             WHERE {visits}.id = (\
                 SELECT latest.id FROM {visits} latest \
                 WHERE latest.siteId = {visits}.siteId \
                 ORDER BY latest.date DESC, latest.id DESC LIMIT 1)"
        );

        let filter = options.and_then(|o| o.filter.clone());
        if filter.is_some() {
            sql.push_str(" AND instr(url, ?1) > 0");
        }

        match options.and_then(|o| o.sort) {
            Some(SortOrder::LastVisit) => sql.push_str(" ORDER BY date DESC, siteId"),
            None => sql.push_str(" ORDER BY siteId"),
        }

        let stmt = BoundStatement::new(sql);
        match filter {
            Some(filter) => stmt.bind(filter),
            None => stmt,
        }
    }
}

fn invalid(err: ValidationError) -> HistoryError {
    HistoryError::InvalidArgument(err.to_string())
}

fn check(errors: Vec<ValidationError>) -> Result<()> {
    match errors.into_iter().next() {
        Some(err) => Err(invalid(err)),
        None => Ok(()),
    }
}

/// Runs `f` inside a transaction, committing on success and rolling back on
/// error. Joins the caller's transaction when one is already open.
fn in_transaction<T, F>(conn: &Connection, operation: &str, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T>,
{
    if !conn.is_autocommit() {
        return f(conn);
    }

    let tx = conn.unchecked_transaction()?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            warn!(operation, error = %err, "Rolling back");
            if let Err(rollback) = tx.rollback() {
                warn!(operation, error = %rollback, "Rollback failed");
            }
            Err(err)
        }
    }
}
