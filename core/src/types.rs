//! History type definitions.
//!
//! This module defines the data model shared by every storage backend: the
//! [`Site`] a user visited, each individual [`Visit`] to it, and the options
//! used to filter and order queries. The types are designed for
//! serialization with [`serde`] so query results can be emitted as JSON.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unique web location.
///
/// Sites are deduplicated by [`url`](Site::url). The `id` is the surrogate
/// key assigned by storage on first insert and the `guid` is a globally
/// unique token generated exactly once, also at first insert, unless the
/// caller already provided one.
///
/// # Examples
///
/// ```
/// use browser_history_core::Site;
///
/// let site = Site::new("https://example.com/", "Example Domain");
/// assert!(site.id.is_none());
/// assert!(site.guid.is_none());
/// assert_eq!(site.url, "https://example.com/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Surrogate key, populated once the site has been stored or resolved.
    pub id: Option<i64>,
    /// Globally unique token, generated on first insert when absent.
    pub guid: Option<String>,
    /// Natural key.
    pub url: String,
    /// Page title.
    pub title: String,
}

impl Site {
    /// Creates an unsaved site.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            guid: None,
            url: url.into(),
            title: title.into(),
        }
    }

    /// Sets a caller-chosen guid.
    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }
}

/// How a visit came about.
///
/// Stored as its integer discriminant, so the values are part of the on-disk
/// format and must never be renumbered.
///
/// # Examples
///
/// ```
/// use browser_history_core::VisitType;
///
/// assert_eq!(VisitType::default(), VisitType::Unknown);
/// assert_eq!(VisitType::Typed.as_i64(), 2);
/// assert_eq!(VisitType::from_i64(7), Some(VisitType::Download));
/// assert_eq!(VisitType::from_i64(42), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VisitType {
    #[default]
    Unknown = 0,
    /// Followed a link.
    Link = 1,
    /// Typed into the address bar.
    Typed = 2,
    /// Opened from a bookmark.
    Bookmark = 3,
    /// Embedded content.
    Embed = 4,
    PermanentRedirect = 5,
    TemporaryRedirect = 6,
    Download = 7,
    /// Link followed inside a frame.
    FramedLink = 8,
}

impl VisitType {
    /// All visit types, in discriminant order.
    pub const ALL: [VisitType; 9] = [
        VisitType::Unknown,
        VisitType::Link,
        VisitType::Typed,
        VisitType::Bookmark,
        VisitType::Embed,
        VisitType::PermanentRedirect,
        VisitType::TemporaryRedirect,
        VisitType::Download,
        VisitType::FramedLink,
    ];

    /// Returns the stored discriminant.
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Parses a stored discriminant, returning `None` for unknown values.
    pub fn from_i64(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_i64() == value)
    }
}

impl fmt::Display for VisitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VisitType::Unknown => "unknown",
            VisitType::Link => "link",
            VisitType::Typed => "typed",
            VisitType::Bookmark => "bookmark",
            VisitType::Embed => "embed",
            VisitType::PermanentRedirect => "permanent-redirect",
            VisitType::TemporaryRedirect => "temporary-redirect",
            VisitType::Download => "download",
            VisitType::FramedLink => "framed-link",
        };
        f.pad(name)
    }
}

/// A single recorded visit to a [`Site`].
///
/// The site is carried by value at the API boundary; storage keeps only its
/// id.
///
/// # Examples
///
/// ```
/// use browser_history_core::{Site, Visit, VisitType};
///
/// let visit = Visit::now(Site::new("https://example.com/", "Example"))
///     .with_type(VisitType::Typed);
/// assert!(visit.id.is_none());
/// assert_eq!(visit.visit_type, VisitType::Typed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    /// Surrogate key, populated once stored.
    pub id: Option<i64>,
    /// The visited site.
    pub site: Site,
    /// When the visit happened.
    pub date: DateTime<Utc>,
    /// How the visit happened.
    #[serde(rename = "type")]
    pub visit_type: VisitType,
}

impl Visit {
    /// Creates an unsaved visit of [`VisitType::Unknown`].
    pub fn new(site: Site, date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            site,
            date,
            visit_type: VisitType::default(),
        }
    }

    /// Creates an unsaved visit stamped with the current time.
    pub fn now(site: Site) -> Self {
        Self::new(site, Utc::now())
    }

    /// Sets the visit type.
    pub fn with_type(mut self, visit_type: VisitType) -> Self {
        self.visit_type = visit_type;
        self
    }
}

/// Ordering applied to query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Most recent visit first.
    LastVisit,
}

/// Filtering and ordering for queries.
///
/// `filter` is matched as a case-sensitive substring of the url, so
/// `"example"` matches both `https://example.com/` and
/// `https://not-example-dot.org/`.
///
/// # Examples
///
/// ```
/// use browser_history_core::{QueryOptions, SortOrder};
///
/// let opts = QueryOptions::default().with_filter("example").sorted(SortOrder::LastVisit);
/// assert_eq!(opts.filter.as_deref(), Some("example"));
/// assert_eq!(opts.sort, Some(SortOrder::LastVisit));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Url substring to match.
    pub filter: Option<String>,
    /// Result ordering.
    pub sort: Option<SortOrder>,
}

impl QueryOptions {
    /// Restricts results to urls containing `filter`.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the ordering.
    pub fn sorted(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// The composite entity accepted by the joined history/visits store.
///
/// Writes look at `visit` first and fall back to `site`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryItem {
    pub site: Option<Site>,
    pub visit: Option<Visit>,
}

impl HistoryItem {
    /// An item carrying only a site.
    pub fn site(site: Site) -> Self {
        Self {
            site: Some(site),
            visit: None,
        }
    }

    /// An item carrying a visit (and, through it, the visited site).
    pub fn visit(visit: Visit) -> Self {
        Self {
            site: None,
            visit: Some(visit),
        }
    }

    /// Returns `true` if neither a site nor a visit is present.
    pub fn is_empty(&self) -> bool {
        self.site.is_none() && self.visit.is_none()
    }
}

/// One row of the joined history view: a site and a representative visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub site: Site,
    pub visit: Visit,
}
