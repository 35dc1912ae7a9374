//! OPDS 1.x (Atom) catalog parsing.
//!
//! Element names are matched on their local part so documents work whatever
//! prefix they bind to the Atom, OPDS, Dublin Core, threading and
//! OpenSearch namespaces.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::model::{
    Facet, Feed, Group, Link, NavigationEntry, Publication, REL_COLLECTION, REL_FACET,
};
use super::parser::{parse_date, ParseError};
use crate::util::strip_control_chars;

/// SEC-003: Maximum element nesting accepted in a catalog document.
const MAX_ATOM_DEPTH: usize = 64;

/// Fields collected while inside an `<entry>` element.
#[derive(Default)]
struct EntryBuilder {
    id: Option<String>,
    title: String,
    authors: Vec<String>,
    summary: Option<String>,
    content: Option<String>,
    published: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    links: Vec<Link>,
}

/// Parses an OPDS 1.x Atom document.
///
/// Entries carrying at least one acquisition link become publications, the
/// rest become navigation entries. Entries linked to a `collection` are
/// placed into the group of that collection instead of the top level.
pub fn parse_atom(content: &str) -> Result<Feed, ParseError> {
    // SEC-002: quick-xml (0.37) never expands <!ENTITY> declarations; custom
    // entities fail in unescape() instead of being resolved.
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut seen_root = false;
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if path.is_empty() {
                    if name != "feed" {
                        return Err(ParseError::NotAFeed);
                    }
                    seen_root = true;
                }
                if path.len() >= MAX_ATOM_DEPTH {
                    return Err(ParseError::MaxDepthExceeded(MAX_ATOM_DEPTH));
                }
                match name.as_str() {
                    "entry" if path.len() == 1 => entry = Some(EntryBuilder::default()),
                    "link" => handle_link(&e, &reader, &path, &mut feed, entry.as_mut())?,
                    _ => {}
                }
                path.push(name);
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                if path.is_empty() {
                    if name != "feed" {
                        return Err(ParseError::NotAFeed);
                    }
                    seen_root = true;
                } else if name == "link" {
                    handle_link(&e, &reader, &path, &mut feed, entry.as_mut())?;
                }
            }
            Ok(Event::Text(e)) => {
                let unescaped = e.unescape().map_err(|e| ParseError::Xml(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(_)) => {
                let Some(name) = path.pop() else {
                    return Err(ParseError::Xml("unbalanced end tag".to_string()));
                };
                let value = clean(&text);
                text.clear();

                match entry.as_mut() {
                    Some(builder) if path.len() >= 2 => {
                        apply_entry_field(builder, &path, &name, value);
                    }
                    Some(_) if name == "entry" => {
                        if let Some(builder) = entry.take() {
                            place_entry(&mut feed, builder);
                        }
                    }
                    _ if path.len() == 1 => match name.as_str() {
                        "title" => feed.metadata.title = value,
                        "totalResults" => feed.metadata.number_of_items = value.parse().ok(),
                        _ => {}
                    },
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(ParseError::NotAFeed);
    }

    Ok(feed)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn clean(text: &str) -> String {
    strip_control_chars(text.trim()).into_owned()
}

/// Stores the text of an element closed inside an entry.
///
/// `parent` is the element path after the closing element was popped, so
/// `parent.last()` is the element that contained it.
fn apply_entry_field(builder: &mut EntryBuilder, parent: &[String], name: &str, value: String) {
    let in_author = parent.last().map(String::as_str) == Some("author");
    if in_author {
        if name == "name" && !value.is_empty() {
            builder.authors.push(value);
        }
        return;
    }
    if parent.last().map(String::as_str) != Some("entry") {
        return;
    }
    match name {
        "id" => builder.id = Some(value).filter(|v| !v.is_empty()),
        "title" => builder.title = value,
        "summary" => builder.summary = Some(value).filter(|v| !v.is_empty()),
        "content" => builder.content = Some(value).filter(|v| !v.is_empty()),
        "published" | "issued" => builder.published = parse_date(&value),
        "updated" => builder.updated = parse_date(&value),
        _ => {}
    }
}

/// Routes a `<link>` to the feed, a facet, or the entry being built.
fn handle_link(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    path: &[String],
    feed: &mut Feed,
    entry: Option<&mut EntryBuilder>,
) -> Result<(), ParseError> {
    let (link, facet_group) = parse_link_attributes(e, reader)?;

    match entry {
        Some(builder) if path.len() == 2 => builder.links.push(link),
        Some(_) => {}
        None if path.len() == 1 => {
            if link.has_rel(REL_FACET) {
                let group = facet_group.unwrap_or_default();
                match feed.facets.iter_mut().find(|f| f.title == group) {
                    Some(facet) => facet.links.push(link),
                    None => feed.facets.push(Facet {
                        title: group,
                        links: vec![link],
                    }),
                }
            } else {
                feed.links.push(link);
            }
        }
        None => {}
    }
    Ok(())
}

/// Extracts a [`Link`] and its `opds:facetGroup` attribute.
fn parse_link_attributes(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<(Link, Option<String>), ParseError> {
    let mut link = Link::default();
    let mut facet_group = None;

    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed link attribute");
                continue;
            }
        };
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| ParseError::Xml(e.to_string()))?;
        match attr.key.local_name().as_ref() {
            b"href" => link.href = Some(value.trim().to_string()).filter(|h| !h.is_empty()),
            b"rel" => link.rel = value.split_whitespace().map(str::to_string).collect(),
            b"type" => link.media_type = Some(value.to_string()),
            b"title" => link.title = Some(clean(&value)),
            b"count" => link.number_of_items = value.trim().parse().ok(),
            b"activeFacet" => link.active = value.trim() == "true",
            b"facetGroup" => facet_group = Some(clean(&value)),
            _ => {}
        }
    }

    Ok((link, facet_group))
}

/// Turns a finished entry into a publication or navigation entry and
/// stores it at the top level or in its collection's group.
fn place_entry(feed: &mut Feed, builder: EntryBuilder) {
    let collection = builder
        .links
        .iter()
        .find(|l| l.has_rel(REL_COLLECTION))
        .cloned();
    let is_publication = builder.links.iter().any(Link::is_acquisition);

    let (navigation, publications) = match collection {
        Some(link) => {
            let title = link
                .title
                .clone()
                .or_else(|| link.href.clone())
                .unwrap_or_default();
            let index = match feed.groups.iter().position(|g| g.title == title) {
                Some(index) => index,
                None => {
                    feed.groups.push(Group {
                        title,
                        links: vec![link],
                        ..Default::default()
                    });
                    feed.groups.len() - 1
                }
            };
            let group = &mut feed.groups[index];
            (&mut group.navigation, &mut group.publications)
        }
        None => (&mut feed.navigation, &mut feed.publications),
    };

    if is_publication {
        publications.push(into_publication(builder));
    } else {
        navigation.push(into_navigation(builder));
    }
}

fn into_navigation(builder: EntryBuilder) -> NavigationEntry {
    let target = builder
        .links
        .iter()
        .filter(|l| !l.has_rel(REL_COLLECTION))
        .find(|l| {
            l.media_type
                .as_deref()
                .is_some_and(|t| t.contains("atom+xml") || t.contains("opds"))
        })
        .or_else(|| builder.links.iter().find(|l| !l.has_rel(REL_COLLECTION)));

    NavigationEntry {
        title: builder.title,
        href: target.and_then(|l| l.href.clone()),
        number_of_items: target.and_then(|l| l.number_of_items),
    }
}

fn into_publication(builder: EntryBuilder) -> Publication {
    let (images, links): (Vec<Link>, Vec<Link>) = builder
        .links
        .into_iter()
        .filter(|l| !l.has_rel(REL_COLLECTION))
        .partition(Link::is_image);

    Publication {
        identifier: builder.id,
        title: builder.title,
        authors: builder.authors,
        summary: builder.summary.or(builder.content),
        published: builder.published.or(builder.updated),
        links,
        images,
    }
}
