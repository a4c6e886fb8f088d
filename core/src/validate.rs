//! Site and visit validation.
//!
//! Catches values that storage would accept but that can never be looked up
//! again, such as empty or whitespace-padded urls, before they are written.
//!
//! # Examples
//!
//! ```
//! use browser_history_core::*;
//!
//! assert!(validate_site(&Site::new("https://example.com/", "Example")).is_empty());
//! assert!(!validate_site(&Site::new("", "Nothing")).is_empty());
//! ```

use thiserror::Error;

use crate::{HistoryItem, Site, Visit};

/// Site/visit validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Url is empty or whitespace-only.
    #[error("site url cannot be empty")]
    EmptyUrl,
    /// Url has leading/trailing whitespace or embedded control characters.
    #[error("site url contains whitespace or control characters: {0:?}")]
    MalformedUrl(String),
    /// Caller-supplied guid is empty.
    #[error("site guid cannot be empty")]
    EmptyGuid,
    /// Neither a site nor a visit was supplied.
    #[error("history item must carry a site or a visit")]
    EmptyItem,
}

/// Validates a single site.
pub fn validate_site(site: &Site) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if site.url.trim().is_empty() {
        errors.push(ValidationError::EmptyUrl);
    } else if site.url.trim() != site.url || site.url.chars().any(char::is_control) {
        errors.push(ValidationError::MalformedUrl(site.url.clone()));
    }

    if site.guid.as_deref().is_some_and(|g| g.trim().is_empty()) {
        errors.push(ValidationError::EmptyGuid);
    }

    errors
}

/// Validates a visit through the site it references.
pub fn validate_visit(visit: &Visit) -> Vec<ValidationError> {
    validate_site(&visit.site)
}

/// Validates the part of a composite item that a write would use.
///
/// The visit takes precedence over the site, mirroring how the store
/// dispatches writes.
pub fn validate_item(item: &HistoryItem) -> Vec<ValidationError> {
    match (&item.visit, &item.site) {
        (Some(visit), _) => validate_visit(visit),
        (None, Some(site)) => validate_site(site),
        (None, None) => vec![ValidationError::EmptyItem],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_site_rejects_empty_url() {
        assert_eq!(
            validate_site(&Site::new("   ", "Blank")),
            vec![ValidationError::EmptyUrl]
        );
    }

    #[test]
    fn test_validate_site_rejects_padded_url() {
        let errors = validate_site(&Site::new(" https://example.com/", "Example"));
        assert_eq!(
            errors,
            vec![ValidationError::MalformedUrl(
                " https://example.com/".to_string()
            )]
        );
        assert!(!validate_site(&Site::new("https://exa\nmple.com/", "x")).is_empty());
    }

    #[test]
    fn test_validate_site_rejects_blank_guid() {
        let site = Site::new("https://example.com/", "Example").with_guid("");
        assert_eq!(validate_site(&site), vec![ValidationError::EmptyGuid]);
    }

    #[test]
    fn test_validate_item_prefers_visit() {
        let good = Site::new("https://example.com/", "Example");
        let bad = Site::new("", "Nothing");
        let item = HistoryItem {
            site: Some(bad),
            visit: Some(Visit::now(good)),
        };
        assert!(validate_item(&item).is_empty());
        assert_eq!(
            validate_item(&HistoryItem::default()),
            vec![ValidationError::EmptyItem]
        );
    }
}
