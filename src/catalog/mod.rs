//! OPDS catalog documents.
//!
//! - [`model`] - the in-memory catalog model shared by every other module
//! - [`parser`] - format detection and the [`ParseError`] type
//! - `atom` - OPDS 1.x (Atom XML) via `quick-xml`
//! - `json` - OPDS 2.0 (JSON) via `serde_json`
//!
//! # Example
//!
//! ```
//! use folio::catalog::parse_feed;
//!
//! let feed = parse_feed(br#"{"metadata":{"title":"Library"}}"#).unwrap();
//! assert_eq!(feed.metadata.title, "Library");
//! ```

mod atom;
mod json;
pub mod model;
mod parser;

pub use model::{Facet, Feed, FeedMetadata, Group, Link, NavigationEntry, Publication};
pub use parser::{parse_feed, CatalogFormat, ParseError};
