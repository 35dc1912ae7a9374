//! OPDS 2.0 (JSON) catalog parsing.
//!
//! The wire structs mirror the JSON document and are converted into the
//! shared catalog model once deserialized.

use serde::Deserialize;

use super::model::{
    Facet, Feed, FeedMetadata, Group, Link, NavigationEntry, Publication,
};
use super::parser::{parse_date, ParseError};
use crate::util::strip_control_chars;

#[derive(Debug, Deserialize)]
struct WireFeed {
    #[serde(default)]
    metadata: WireMetadata,
    #[serde(default)]
    links: Vec<WireLink>,
    #[serde(default)]
    navigation: Vec<WireLink>,
    #[serde(default)]
    publications: Vec<WirePublication>,
    #[serde(default)]
    groups: Vec<WireGroup>,
    #[serde(default)]
    facets: Vec<WireFacet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    number_of_items: Option<u64>,
    #[serde(default)]
    author: Option<Contributors>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    modified: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLinkProperties {
    #[serde(default)]
    number_of_items: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireLink {
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    rel: Option<OneOrMany<String>>,
    #[serde(default, rename = "type")]
    media_type: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    properties: WireLinkProperties,
}

#[derive(Debug, Deserialize)]
struct WirePublication {
    #[serde(default)]
    metadata: WireMetadata,
    #[serde(default)]
    links: Vec<WireLink>,
    #[serde(default)]
    images: Vec<WireLink>,
}

#[derive(Debug, Deserialize)]
struct WireGroup {
    #[serde(default)]
    metadata: WireMetadata,
    #[serde(default)]
    links: Vec<WireLink>,
    #[serde(default)]
    navigation: Vec<WireLink>,
    #[serde(default)]
    publications: Vec<WirePublication>,
}

#[derive(Debug, Deserialize)]
struct WireFacet {
    #[serde(default)]
    metadata: WireMetadata,
    #[serde(default)]
    links: Vec<WireLink>,
}

/// OPDS 2 lets several fields be either a single value or an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(v) => vec![v],
            Self::Many(v) => v,
        }
    }
}

/// A contributor is a bare name or an object with a `name` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Contributor {
    Name(String),
    Object { name: String },
}

type Contributors = OneOrMany<Contributor>;

/// Parses an OPDS 2.0 JSON document.
pub fn parse_json(bytes: &[u8]) -> Result<Feed, ParseError> {
    let wire: WireFeed = serde_json::from_slice(bytes)?;

    Ok(Feed {
        metadata: FeedMetadata {
            title: text(wire.metadata.title),
            number_of_items: wire.metadata.number_of_items,
        },
        navigation: wire.navigation.into_iter().map(navigation_entry).collect(),
        groups: wire.groups.into_iter().map(group).collect(),
        publications: wire.publications.into_iter().map(publication).collect(),
        facets: wire
            .facets
            .into_iter()
            .map(|f| Facet {
                title: text(f.metadata.title),
                links: f.links.into_iter().map(link).collect(),
            })
            .collect(),
        links: wire.links.into_iter().map(link).collect(),
    })
}

fn text(value: Option<String>) -> String {
    value
        .map(|v| strip_control_chars(v.trim()).into_owned())
        .unwrap_or_default()
}

fn link(wire: WireLink) -> Link {
    Link {
        href: wire.href.filter(|h| !h.trim().is_empty()),
        rel: wire.rel.map(OneOrMany::into_vec).unwrap_or_default(),
        media_type: wire.media_type,
        title: wire.title.map(|t| strip_control_chars(&t).into_owned()),
        number_of_items: wire.properties.number_of_items,
        active: false,
    }
}

fn navigation_entry(wire: WireLink) -> NavigationEntry {
    NavigationEntry {
        title: text(wire.title),
        href: wire.href.filter(|h| !h.trim().is_empty()),
        number_of_items: wire.properties.number_of_items,
    }
}

fn group(wire: WireGroup) -> Group {
    Group {
        title: text(wire.metadata.title),
        links: wire.links.into_iter().map(link).collect(),
        navigation: wire.navigation.into_iter().map(navigation_entry).collect(),
        publications: wire.publications.into_iter().map(publication).collect(),
    }
}

fn publication(wire: WirePublication) -> Publication {
    let metadata = wire.metadata;
    let authors = metadata
        .author
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .map(|c| match c {
            Contributor::Name(name) | Contributor::Object { name } => {
                strip_control_chars(&name).into_owned()
            }
        })
        .collect();
    let published = metadata
        .published
        .as_deref()
        .or(metadata.modified.as_deref())
        .and_then(parse_date);

    Publication {
        identifier: metadata.identifier,
        title: text(metadata.title),
        authors,
        summary: metadata
            .description
            .map(|d| strip_control_chars(&d).into_owned()),
        published,
        links: wire.links.into_iter().map(link).collect(),
        images: wire.images.into_iter().map(link).collect(),
    }
}
