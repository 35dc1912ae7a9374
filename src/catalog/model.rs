use chrono::{DateTime, Utc};

/// Link relation marking the next page of a paginated feed.
pub const REL_NEXT: &str = "next";
/// Prefix shared by every OPDS acquisition relation (`/open-access`, `/borrow`, ...).
pub const REL_ACQUISITION_PREFIX: &str = "http://opds-spec.org/acquisition";
/// Relation used by OPDS 1.x for facet links.
pub const REL_FACET: &str = "http://opds-spec.org/facet";
/// Relation OPDS 1.2 uses to attach an entry to a group.
pub const REL_COLLECTION: &str = "collection";

/// A parsed OPDS catalog document.
///
/// Every collection keeps the order in which its items appeared in the
/// document; that order is also the display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    pub metadata: FeedMetadata,
    pub navigation: Vec<NavigationEntry>,
    pub groups: Vec<Group>,
    pub publications: Vec<Publication>,
    pub facets: Vec<Facet>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedMetadata {
    pub title: String,
    /// Total number of items across all pages, when the server advertises it.
    pub number_of_items: Option<u64>,
}

/// A hyperlink with its relation set.
///
/// `rel` is a list because both OPDS 1 (space separated) and OPDS 2 (array)
/// allow a single link to carry several relations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    pub href: Option<String>,
    pub rel: Vec<String>,
    pub media_type: Option<String>,
    pub title: Option<String>,
    pub number_of_items: Option<u64>,
    /// Set on facet options that describe the filter currently applied.
    pub active: bool,
}

impl Link {
    /// Returns true if any of the link's relations equals `rel`.
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rel.iter().any(|r| r == rel)
    }

    pub fn is_acquisition(&self) -> bool {
        self.rel
            .iter()
            .any(|r| r.starts_with(REL_ACQUISITION_PREFIX))
    }

    pub fn is_image(&self) -> bool {
        self.rel.iter().any(|r| {
            r == "http://opds-spec.org/image"
                || r == "http://opds-spec.org/image/thumbnail"
                || r == "cover"
                || r == "thumbnail"
        })
    }
}

/// A navigable entry pointing at another catalog feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationEntry {
    pub title: String,
    pub href: Option<String>,
    pub number_of_items: Option<u64>,
}

/// A titled collection rendered as one display section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub title: String,
    /// The first link is the "more" link leading to the full collection.
    pub links: Vec<Link>,
    pub navigation: Vec<NavigationEntry>,
    pub publications: Vec<Publication>,
}

impl Group {
    pub fn more_link(&self) -> Option<&Link> {
        self.links.first()
    }
}

/// A named filter dimension offering alternative link targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facet {
    pub title: String,
    pub links: Vec<Link>,
}

impl Facet {
    /// Index of the option flagged active by the server, if any.
    pub fn active_index(&self) -> Option<usize> {
        self.links.iter().position(|l| l.active)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Publication {
    pub identifier: Option<String>,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub links: Vec<Link>,
    pub images: Vec<Link>,
}

impl Publication {
    pub fn acquisition_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|l| l.is_acquisition())
    }

    /// Comma separated author list for compact display.
    pub fn byline(&self) -> String {
        self.authors.join(", ")
    }
}

impl Feed {
    /// The pagination cursor: href of the first link whose relations contain `next`.
    pub fn next_page_href(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.has_rel(REL_NEXT))
            .and_then(|l| l.href.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.navigation.is_empty() && self.groups.is_empty() && self.publications.is_empty()
    }
}
