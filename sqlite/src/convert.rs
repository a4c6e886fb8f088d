//! Conversion between history types and SQLite values.
//!
//! Timestamps are stored as INTEGER microseconds since the Unix epoch, so a
//! round trip is exact to the microsecond. Visit types are stored as their
//! [`VisitType`] discriminant.

use browser_history_core::{HistoryEntry, Site, Visit, VisitType};
use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, Value, ValueRef};

/// Converts a visit date into its stored representation.
pub(crate) fn date_to_value(date: &DateTime<Utc>) -> Value {
    Value::Integer(date.timestamp_micros())
}

/// Converts a visit type into its stored representation.
pub(crate) fn visit_type_to_value(visit_type: VisitType) -> Value {
    Value::Integer(visit_type.as_i64())
}

/// Stored visit date, read back from INTEGER microseconds.
pub(crate) struct StoredDate(pub DateTime<Utc>);

impl FromSql for StoredDate {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let micros = value.as_i64()?;
        DateTime::from_timestamp_micros(micros)
            .map(StoredDate)
            .ok_or(FromSqlError::OutOfRange(micros))
    }
}

/// Stored visit type, read back from its discriminant.
pub(crate) struct StoredVisitType(pub VisitType);

impl FromSql for StoredVisitType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_i64()?;
        VisitType::from_i64(raw)
            .map(StoredVisitType)
            .ok_or(FromSqlError::OutOfRange(raw))
    }
}

/// Builds a [`Site`] from a row projecting `id`, `guid`, `url`, `title`.
///
/// `id_column` names the id column, which differs between the plain site
/// query (`id`) and the joined views (`siteId`).
pub(crate) fn site_from_row(row: &Row<'_>, id_column: &str) -> rusqlite::Result<Site> {
    Ok(Site {
        id: row.get(id_column)?,
        guid: row.get("guid")?,
        url: row.get("url")?,
        title: row.get("title")?,
    })
}

/// Builds a joined entry from a row projecting
/// `siteId, visitId, url, title, guid, date, type`.
pub(crate) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let site = site_from_row(row, "siteId")?;
    let StoredDate(date) = row.get("date")?;
    let StoredVisitType(visit_type) = row.get("type")?;
    let visit = Visit {
        id: Some(row.get("visitId")?),
        site: site.clone(),
        date,
        visit_type,
    };
    Ok(HistoryEntry { site, visit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rusqlite::Connection;

    #[test]
    fn test_date_round_trip_keeps_microseconds() {
        let conn = Connection::open_in_memory().unwrap();
        let date = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let StoredDate(back) = conn
            .query_row("SELECT ?1", [date_to_value(&date)], |row| row.get(0))
            .unwrap();
        assert_eq!(back.timestamp(), date.timestamp());
        assert_eq!(back.timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn test_unknown_visit_type_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.query_row("SELECT 42", [], |row| row.get::<_, StoredVisitType>(0));
        assert!(result.is_err());

        let StoredVisitType(t) = conn
            .query_row("SELECT ?1", [visit_type_to_value(VisitType::Typed)], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(t, VisitType::Typed);
    }

    #[test]
    fn test_site_from_row_allows_null_id_and_guid() {
        let conn = Connection::open_in_memory().unwrap();
        let site = conn
            .query_row(
                "SELECT NULL AS id, NULL AS guid, 'https://example.com/' AS url, 'Example' AS title",
                [],
                |row| site_from_row(row, "id"),
            )
            .unwrap();
        assert_eq!(site, Site::new("https://example.com/", "Example"));
    }
}
