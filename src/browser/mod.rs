//! Feed browsing core.
//!
//! A [`FeedBrowser`] holds one fetched feed, classifies it into a
//! [`BrowsingMode`], and derives sections and rows from that mode. It also
//! owns the pagination cursor and turns facet, navigation and group
//! selections into target URLs.
//!
//! The browser only talks to the outside through two traits:
//! [`FeedFetcher`](crate::fetch::FeedFetcher) for documents and
//! [`Presenter`] for the UI. Views are kept on a [`NavigationStack`].

mod feed_browser;
mod layout;
mod mode;
mod presenter;
mod stack;

pub use feed_browser::{FeedBrowser, LoadState, PageError, PageToken};
pub use layout::{Row, RowHeight};
pub use mode::{classify, BrowsingMode};
pub use presenter::Presenter;
pub use stack::{NavigationStack, View, ViewId};
