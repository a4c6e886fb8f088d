//! The sites table.

use browser_history_core::{QueryOptions, Site};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::convert::site_from_row;
use crate::error::Result;
use crate::schema::{HISTORY_COLUMNS, history_table_name, validate_prefix};
use crate::table::{BoundStatement, Table, execute_query};

/// One row per [`Site`], unique by url and by guid.
///
/// Only the title is mutable: updates and deletes address rows by url.
///
/// # Examples
///
/// ```
/// use browser_history_core::Site;
/// use browser_history_sqlite::{HistoryTable, Table};
/// use rusqlite::Connection;
///
/// let conn = Connection::open_in_memory().unwrap();
/// let history = HistoryTable::new("browser_").unwrap();
/// history.create(&conn, 2).unwrap();
///
/// let mut site = Site::new("https://example.com/", "Example");
/// let id = history.insert(&conn, &mut site).unwrap();
/// assert!(site.guid.is_some());
///
/// let found = history.find_by_url(&conn, "https://example.com/").unwrap();
/// assert_eq!(found[0].id, Some(id));
/// ```
#[derive(Debug, Clone)]
pub struct HistoryTable {
    name: String,
}

impl HistoryTable {
    /// Creates the table descriptor for the given prefix.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidPrefix`](crate::HistoryError::InvalidPrefix)
    /// if the prefix is invalid.
    pub fn new(prefix: &str) -> Result<Self> {
        validate_prefix(prefix)?;
        Ok(Self {
            name: history_table_name(prefix),
        })
    }

    /// Looks up sites whose url is exactly `url`.
    ///
    /// The url column is unique, so a well-formed table yields zero or one
    /// match; callers decide what any other count means.
    pub fn find_by_url(&self, conn: &Connection, url: &str) -> Result<Vec<Site>> {
        let stmt = BoundStatement::new(format!(
            "SELECT id, guid, url, title FROM {} WHERE url = ?1",
            self.name
        ))
        .bind(url.to_string());
        execute_query(conn, &stmt, Self::from_row)
    }
}

impl Table for HistoryTable {
    type Item = Site;

    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &'static str {
        HISTORY_COLUMNS
    }

    fn insert_statement(&self, site: &mut Site) -> Result<BoundStatement> {
        let guid = site
            .guid
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();
        Ok(BoundStatement::new(format!(
            "INSERT INTO {} (guid, url, title) VALUES (?1, ?2, ?3)",
            self.name
        ))
        .bind(guid)
        .bind(site.url.clone())
        .bind(site.title.clone()))
    }

    fn update_statement(&self, site: &Site) -> Result<BoundStatement> {
        Ok(
            BoundStatement::new(format!("UPDATE {} SET title = ?1 WHERE url = ?2", self.name))
                .bind(site.title.clone())
                .bind(site.url.clone()),
        )
    }

    fn delete_statement(&self, site: Option<&Site>) -> Result<BoundStatement> {
        Ok(match site {
            Some(site) => BoundStatement::new(format!("DELETE FROM {} WHERE url = ?1", self.name))
                .bind(site.url.clone()),
            None => BoundStatement::new(format!("DELETE FROM {}", self.name)),
        })
    }

    fn query_statement(&self, options: Option<&QueryOptions>) -> BoundStatement {
        let select = format!("SELECT id, guid, url, title FROM {}", self.name);
        match options.and_then(|o| o.filter.as_ref()) {
            // instr() is a case-sensitive substring test with no wildcard
            // characters of its own.
            Some(filter) => {
                BoundStatement::new(format!("{select} WHERE instr(url, ?1) > 0 ORDER BY id"))
                    .bind(filter.clone())
            }
            None => BoundStatement::new(format!("{select} ORDER BY id")),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Site> {
        site_from_row(row, "id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value;

    fn table() -> HistoryTable {
        HistoryTable::new("t_").unwrap()
    }

    #[test]
    fn test_new_validates_prefix() {
        assert!(HistoryTable::new("").is_err());
        assert_eq!(table().name(), "t_history");
    }

    #[test]
    fn test_insert_generates_guid_once() {
        let mut site = Site::new("https://example.com/", "Example");
        let first = table().insert_statement(&mut site).unwrap();
        let guid = site.guid.clone().unwrap();
        assert!(!guid.is_empty());
        assert_eq!(first.args[0], Value::Text(guid.clone()));

        table().insert_statement(&mut site).unwrap();
        assert_eq!(site.guid.as_deref(), Some(guid.as_str()));
    }

    #[test]
    fn test_insert_keeps_caller_guid() {
        let mut site = Site::new("https://example.com/", "Example").with_guid("abc");
        let stmt = table().insert_statement(&mut site).unwrap();
        assert_eq!(stmt.args[0], Value::Text("abc".to_string()));
    }

    #[test]
    fn test_update_sets_title_by_url() {
        let stmt = table()
            .update_statement(&Site::new("https://example.com/", "New"))
            .unwrap();
        assert_eq!(stmt.sql, "UPDATE t_history SET title = ?1 WHERE url = ?2");
        assert_eq!(
            stmt.args,
            vec![
                Value::Text("New".to_string()),
                Value::Text("https://example.com/".to_string())
            ]
        );
    }

    #[test]
    fn test_delete_without_site_is_wildcard() {
        let stmt = table().delete_statement(None).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM t_history");
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_query_filter_is_substring() {
        let opts = QueryOptions::default().with_filter("example");
        let stmt = table().query_statement(Some(&opts));
        assert!(stmt.sql.contains("instr(url, ?1) > 0"));
        assert_eq!(stmt.args, vec![Value::Text("example".to_string())]);

        let all = table().query_statement(None);
        assert!(!all.sql.contains("WHERE"));
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let conn = Connection::open_in_memory().unwrap();
        let history = table();
        history.create(&conn, 1).unwrap();
        history
            .insert(&conn, &mut Site::new("https://Example.com/", "Upper"))
            .unwrap();

        let lower = QueryOptions::default().with_filter("example");
        assert!(history.query(&conn, Some(&lower)).unwrap().is_empty());
        let upper = QueryOptions::default().with_filter("Example");
        assert_eq!(history.query(&conn, Some(&upper)).unwrap().len(), 1);
    }
}
