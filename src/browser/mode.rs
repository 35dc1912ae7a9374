use crate::catalog::Feed;

/// Display shape of a feed, derived from which collections it populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowsingMode {
    /// Only navigation entries.
    Navigation,
    /// Only publications.
    Publication,
    /// Only groups.
    MixedGroup,
    /// Navigation entries and publications, no groups.
    MixedNavigationPublication,
    /// Navigation entries, groups and publications.
    MixedNavigationGroupPublication,
    /// Empty feeds and every other combination.
    #[default]
    None,
}

impl BrowsingMode {
    /// Maps the presence of (navigation, groups, publications) to a mode.
    ///
    /// Groups together with publications but without navigation entries has
    /// no layout of its own and yields `None`, as do empty feeds.
    pub fn from_presence(navigation: bool, groups: bool, publications: bool) -> Self {
        match (navigation, groups, publications) {
            (true, false, false) => Self::Navigation,
            (false, false, true) => Self::Publication,
            (false, true, false) => Self::MixedGroup,
            (true, false, true) => Self::MixedNavigationPublication,
            (true, true, true) => Self::MixedNavigationGroupPublication,
            _ => Self::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Publication => "publications",
            Self::MixedGroup => "groups",
            Self::MixedNavigationPublication => "navigation + publications",
            Self::MixedNavigationGroupPublication => "navigation + groups + publications",
            Self::None => "empty",
        }
    }
}

/// Classifies a feed by the collections it populates.
pub fn classify(feed: &Feed) -> BrowsingMode {
    BrowsingMode::from_presence(
        !feed.navigation.is_empty(),
        !feed.groups.is_empty(),
        !feed.publications.is_empty(),
    )
}
