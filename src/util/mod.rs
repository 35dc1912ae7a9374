//! Utility functions for common operations.
//!
//! - **URL validation**: SSRF policy for catalog URLs and opened links
//! - **Text processing**: control-character stripping and width-aware truncation
//!
//! # Examples
//!
//! ```
//! use folio::util::{truncate_to_width, validate_url, HostPolicy};
//!
//! let _url = validate_url("https://example.com/opds", HostPolicy::PublicOnly).unwrap();
//! let title = truncate_to_width("A rather long publication title", 15);
//! assert_eq!(title, "A rather lon...");
//! ```

mod text;
mod url_validator;

pub use text::{strip_control_chars, truncate_to_width};
pub use url_validator::{
    check_url, validate_url, validate_url_for_open, HostPolicy, UrlValidationError,
};
