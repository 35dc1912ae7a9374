use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use super::atom::parse_atom;
use super::json::parse_json;
use super::model::Feed;

/// Errors that can occur while turning a response body into a [`Feed`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// XML was malformed or used an entity we refuse to resolve.
    #[error("XML parse error: {0}")]
    Xml(String),
    /// OPDS 2 document was not valid JSON for the expected shape.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// The body is not UTF-8 encoded.
    #[error("Catalog is not valid UTF-8")]
    Encoding,
    /// The document parsed but its root is not an Atom `<feed>`.
    #[error("Document is not an OPDS feed")]
    NotAFeed,
    /// SEC-003: Element nesting exceeds the safety limit.
    #[error("Nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),
}

/// Serialization of an OPDS catalog document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    /// OPDS 1.x, Atom XML.
    Atom,
    /// OPDS 2.0, JSON.
    Json,
}

impl CatalogFormat {
    /// Sniffs the format from the first significant byte of the body.
    ///
    /// Content-Type headers are unreliable on catalog servers, so the body
    /// decides: a JSON object starts with `{`, anything else is treated as XML.
    pub fn detect(bytes: &[u8]) -> Self {
        let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        match body.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Self::Json,
            _ => Self::Atom,
        }
    }
}

/// Parses an OPDS 1.x or 2.0 catalog document.
pub fn parse_feed(bytes: &[u8]) -> Result<Feed, ParseError> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match CatalogFormat::detect(body) {
        CatalogFormat::Json => parse_json(body),
        CatalogFormat::Atom => {
            let content = std::str::from_utf8(body).map_err(|_| ParseError::Encoding)?;
            parse_atom(content)
        }
    }
}

/// Parses RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
pub(super) fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(CatalogFormat::detect(b"  \n{\"metadata\":{}}"), CatalogFormat::Json);
        assert_eq!(CatalogFormat::detect(b"\xEF\xBB\xBF{}"), CatalogFormat::Json);
        assert_eq!(CatalogFormat::detect(b"<?xml version=\"1.0\"?><feed/>"), CatalogFormat::Atom);
        assert_eq!(CatalogFormat::detect(b""), CatalogFormat::Atom);
    }

    #[test]
    fn test_equivalent_documents_produce_same_shape() {
        let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Root</title>
  <link rel="next" href="/p2"/>
  <entry><title>Fiction</title><link href="/fiction" type="application/atom+xml;profile=opds-catalog"/></entry>
</feed>"#;
        let json = r#"{"metadata":{"title":"Root"},"links":[{"rel":"next","href":"/p2"}],
"navigation":[{"title":"Fiction","href":"/fiction","type":"application/opds+json"}]}"#;

        let from_atom = parse_feed(atom.as_bytes()).unwrap();
        let from_json = parse_feed(json.as_bytes()).unwrap();

        assert_eq!(from_atom.metadata.title, from_json.metadata.title);
        assert_eq!(from_atom.navigation, from_json.navigation);
        assert_eq!(from_atom.next_page_href(), from_json.next_page_href());
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let result = parse_feed(b"<feed>\xFF\xFE</feed>");
        assert!(matches!(result, Err(ParseError::Encoding)));
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2021-03-04T05:06:07Z").is_some());
        assert!(parse_date("2021-03-04T05:06:07+02:00").is_some());
        assert!(parse_date("2021-03-04").is_some());
        assert!(parse_date("March 2021").is_none());
    }
}
