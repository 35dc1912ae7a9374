//! Section and row layout derived from `(mode, feed)`.
//!
//! | mode | sections | rows per section |
//! |---|---|---|
//! | Navigation | 1 | nav count |
//! | Publication | 1 | 1 |
//! | MixedGroup | group count | 1 each |
//! | MixedNavigationPublication | 2 | nav count, 1 |
//! | MixedNavigationGroupPublication | 2 + group count | nav count, 1 each, 1 |
//! | None | 0 | 0 |
//!
//! Publications are always shown as a single row holding the whole list.

use super::mode::BrowsingMode;
use crate::catalog::{Feed, Group, NavigationEntry, Publication};

/// How much vertical space a row wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowHeight {
    /// One line per row.
    Standard,
    /// A horizontal strip of publications.
    Carousel,
    /// The row fills the viewport.
    FullPage,
}

impl RowHeight {
    /// Terminal lines used by a row of this height.
    pub fn lines(self, viewport: u16) -> u16 {
        match self {
            Self::Standard => 1,
            Self::Carousel => 4.min(viewport),
            Self::FullPage => viewport,
        }
    }
}

/// One displayable row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Row<'a> {
    Navigation(&'a NavigationEntry),
    Publications(&'a [Publication]),
    Group(&'a Group),
}

/// What a section holds, before it is expanded into rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Navigation,
    Group(usize),
    Publications,
}

fn section_kind(mode: BrowsingMode, feed: &Feed, section: usize) -> Option<Section> {
    let groups = feed.groups.len();
    match (mode, section) {
        (BrowsingMode::Navigation, 0) => Some(Section::Navigation),
        (BrowsingMode::Publication, 0) => Some(Section::Publications),
        (BrowsingMode::MixedGroup, s) if s < groups => Some(Section::Group(s)),
        (BrowsingMode::MixedNavigationPublication, 0) => Some(Section::Navigation),
        (BrowsingMode::MixedNavigationPublication, 1) => Some(Section::Publications),
        (BrowsingMode::MixedNavigationGroupPublication, 0) => Some(Section::Navigation),
        (BrowsingMode::MixedNavigationGroupPublication, s) if s <= groups => {
            Some(Section::Group(s - 1))
        }
        (BrowsingMode::MixedNavigationGroupPublication, s) if s == groups + 1 => {
            Some(Section::Publications)
        }
        _ => None,
    }
}

pub fn section_count(mode: BrowsingMode, feed: &Feed) -> usize {
    match mode {
        BrowsingMode::Navigation | BrowsingMode::Publication => 1,
        BrowsingMode::MixedGroup => feed.groups.len(),
        BrowsingMode::MixedNavigationPublication => 2,
        BrowsingMode::MixedNavigationGroupPublication => 2 + feed.groups.len(),
        BrowsingMode::None => 0,
    }
}

pub fn row_count(mode: BrowsingMode, feed: &Feed, section: usize) -> usize {
    match section_kind(mode, feed, section) {
        Some(Section::Navigation) => feed.navigation.len(),
        Some(Section::Group(_)) | Some(Section::Publications) => 1,
        None => 0,
    }
}

pub fn section_title(mode: BrowsingMode, feed: &Feed, section: usize) -> Option<&str> {
    match section_kind(mode, feed, section)? {
        Section::Group(index) => feed.groups.get(index).map(|g| g.title.as_str()),
        Section::Navigation | Section::Publications => None,
    }
}

pub fn row_height(mode: BrowsingMode) -> RowHeight {
    match mode {
        BrowsingMode::Publication => RowHeight::FullPage,
        BrowsingMode::MixedGroup => RowHeight::Carousel,
        _ => RowHeight::Standard,
    }
}

/// Index into `feed.groups` shown by `section`, if it is a group section.
pub fn group_index(mode: BrowsingMode, feed: &Feed, section: usize) -> Option<usize> {
    match section_kind(mode, feed, section)? {
        Section::Group(index) => Some(index),
        Section::Navigation | Section::Publications => None,
    }
}

pub fn row(mode: BrowsingMode, feed: &Feed, section: usize, row: usize) -> Option<Row<'_>> {
    match section_kind(mode, feed, section)? {
        Section::Navigation => feed.navigation.get(row).map(Row::Navigation),
        Section::Group(index) if row == 0 => feed.groups.get(index).map(Row::Group),
        Section::Publications if row == 0 => Some(Row::Publications(&feed.publications)),
        _ => None,
    }
}
