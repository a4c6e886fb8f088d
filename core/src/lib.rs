//! Core history types shared by storage backends.
//!
//! This crate defines the foundational types for modeling browsing history:
//!
//! - [`Site`]: a unique web location, deduplicated by url.
//! - [`Visit`]: one recorded visit to a site at a point in time, with a
//!   [`VisitType`] classification.
//! - [`QueryOptions`]: url substring filter and [`SortOrder`].
//! - [`HistoryItem`]: the `(site?, visit?)` pair accepted by the joined
//!   history/visits store.
//! - [`HistoryEntry`]: one row of the joined view.
//!
//! Validation ([`validate_site`], [`validate_visit`], [`validate_item`])
//! rejects values that could never be looked up again once stored.
//!
//! # Example
//!
//! ```
//! use browser_history_core::*;
//!
//! let site = Site::new("https://example.com/", "Example Domain");
//! let visit = Visit::now(site).with_type(VisitType::Link);
//! let item = HistoryItem::visit(visit);
//!
//! assert!(validate_item(&item).is_empty());
//! ```

mod types;
mod validate;

pub use types::*;
pub use validate::{ValidationError, validate_item, validate_site, validate_visit};
