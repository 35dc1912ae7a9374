use thiserror::Error;
use url::Url;

use super::layout::{self, Row, RowHeight};
use super::mode::{classify, BrowsingMode};
use super::presenter::Presenter;
use crate::catalog::Feed;
use crate::fetch::{FeedFetcher, FetchError};

/// Progress of the initial load of a browser's feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Identifies one claim made by [`FeedBrowser::begin_next_page`].
///
/// A page result is only applied when it carries the token of the claim
/// that is still pending, so a fetch started before a reload can never
/// answer a claim made after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageToken(u64);

/// Errors from appending the next page of a feed.
#[derive(Debug, Error)]
pub enum PageError {
    /// The feed has no `next` link
    #[error("No further pages")]
    NoMorePages,
    /// Another page fetch for this browser has not finished yet
    #[error("A page is already loading")]
    InFlight,
    /// The initial load has not completed
    #[error("Feed not loaded")]
    NotLoaded,
    /// A page result does not match the pending claim (the browser was
    /// reloaded or the claim was released since)
    #[error("Page result no longer applies")]
    Stale,
    /// The page fetch itself failed
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// One catalog view: a feed URL, the feed fetched from it, and its layout.
///
/// A browser is created for a URL and never re-pointed. Following a
/// navigation entry, a group's "more" link, or a facet produces a URL for a
/// fresh browser instead (see [`NavigationStack`](super::NavigationStack)).
///
/// Loading and paging are split into `begin_*`/`finish_*` halves so the
/// fetch can run on another task while the browser stays on the UI side.
/// [`load`](Self::load) and [`append_next_page`](Self::append_next_page)
/// compose the halves for callers that can await in place.
#[derive(Debug, Clone)]
pub struct FeedBrowser {
    original_url: Url,
    /// URL of the most recently fetched page; base for relative hrefs.
    current_url: Url,
    next_page: Option<Url>,
    feed: Option<Feed>,
    mode: BrowsingMode,
    load_state: LoadState,
    /// Token and URL of the page fetch in progress, if any.
    page_in_flight: Option<(PageToken, Url)>,
    /// Source of claim tokens; never reused within one browser.
    page_claims: u64,
}

impl FeedBrowser {
    pub fn new(url: Url) -> Self {
        Self {
            current_url: url.clone(),
            original_url: url,
            next_page: None,
            feed: None,
            mode: BrowsingMode::None,
            load_state: LoadState::Idle,
            page_in_flight: None,
            page_claims: 0,
        }
    }

    pub fn original_url(&self) -> &Url {
        &self.original_url
    }

    pub fn current_url(&self) -> &Url {
        &self.current_url
    }

    pub fn next_page(&self) -> Option<&Url> {
        self.next_page.as_ref()
    }

    pub fn feed(&self) -> Option<&Feed> {
        self.feed.as_ref()
    }

    pub fn mode(&self) -> BrowsingMode {
        self.mode
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn is_page_in_flight(&self) -> bool {
        self.page_in_flight.is_some()
    }

    /// Title of the loaded feed, or the URL while nothing is loaded.
    pub fn title(&self) -> &str {
        match &self.feed {
            Some(feed) if !feed.metadata.title.is_empty() => &feed.metadata.title,
            _ => self.original_url.as_str(),
        }
    }

    /// Whether the presenter should offer a filter menu.
    pub fn has_facets(&self) -> bool {
        self.feed.as_ref().is_some_and(|f| !f.facets.is_empty())
    }

    // ========================================================================
    // Initial load
    // ========================================================================

    /// Marks the browser as loading and returns the URL to fetch.
    pub fn begin_load(&mut self, presenter: &mut dyn Presenter) -> Url {
        self.load_state = LoadState::Loading;
        presenter.busy(true);
        self.original_url.clone()
    }

    /// Applies the outcome of a fetch started with [`begin_load`](Self::begin_load).
    ///
    /// On failure the previous feed, mode and cursor are kept and the
    /// presenter is told about the error.
    pub fn finish_load(&mut self, result: Result<Feed, FetchError>, presenter: &mut dyn Presenter) {
        presenter.busy(false);
        match result {
            Ok(feed) => {
                self.current_url = self.original_url.clone();
                self.next_page = resolve_next(&self.current_url, &feed);
                self.mode = classify(&feed);
                self.feed = Some(feed);
                self.load_state = LoadState::Loaded;
                // A reload invalidates any page fetched against the old feed
                self.page_in_flight = None;
                tracing::debug!(
                    url = %self.original_url,
                    mode = self.mode.label(),
                    next = self.next_page.as_ref().map(|u| u.as_str()).unwrap_or("none"),
                    "Feed loaded"
                );
                presenter.feed_ready(self);
            }
            Err(e) => {
                tracing::warn!(url = %self.original_url, error = %e, "Feed load failed");
                self.load_state = LoadState::Failed(e.to_string());
                presenter.load_failed(&self.original_url, &e);
            }
        }
    }

    pub async fn load(&mut self, fetcher: &dyn FeedFetcher, presenter: &mut dyn Presenter) {
        let url = self.begin_load(presenter);
        let result = fetcher.fetch(&url).await;
        self.finish_load(result, presenter);
    }

    // ========================================================================
    // Pagination
    // ========================================================================

    /// Claims the next page for fetching.
    ///
    /// Fails with [`PageError::NoMorePages`] when there is no cursor and
    /// with [`PageError::InFlight`] while a previous page is still pending.
    /// The returned token must be handed back to
    /// [`finish_next_page`](Self::finish_next_page) with the result.
    pub fn begin_next_page(&mut self) -> Result<(PageToken, Url), PageError> {
        if self.feed.is_none() {
            return Err(PageError::NotLoaded);
        }
        if self.page_in_flight.is_some() {
            return Err(PageError::InFlight);
        }
        let url = self.next_page.clone().ok_or(PageError::NoMorePages)?;
        self.page_claims += 1;
        let token = PageToken(self.page_claims);
        self.page_in_flight = Some((token, url.clone()));
        Ok((token, url))
    }

    /// Applies a page fetched for [`begin_next_page`](Self::begin_next_page).
    ///
    /// On success the page's publications are appended in order and the
    /// cursor moves to the page's own `next` link. The mode is not
    /// recomputed. On failure cursor and publications are untouched.
    ///
    /// A `token` other than the pending claim's yields [`PageError::Stale`]
    /// and leaves the pending claim in place.
    pub fn finish_next_page(
        &mut self,
        token: PageToken,
        result: Result<Feed, FetchError>,
    ) -> Result<&Feed, PageError> {
        let page_url = match self.page_in_flight.take() {
            Some((pending, url)) if pending == token => url,
            other => {
                self.page_in_flight = other;
                return Err(PageError::Stale);
            }
        };
        let page = result?;
        let feed = self.feed.as_mut().ok_or(PageError::NotLoaded)?;

        self.next_page = resolve_next(&page_url, &page);
        tracing::debug!(
            url = %page_url,
            added = page.publications.len(),
            more = self.next_page.is_some(),
            "Appended catalog page"
        );
        feed.publications.extend(page.publications);
        self.current_url = page_url;
        Ok(&*feed)
    }

    /// Releases the claim identified by `token` without applying a result.
    ///
    /// Does nothing when a different claim is pending.
    pub fn cancel_next_page(&mut self, token: PageToken) {
        if matches!(self.page_in_flight, Some((pending, _)) if pending == token) {
            self.page_in_flight = None;
        }
    }

    /// Fetches and appends the next page.
    ///
    /// Returns `Ok(None)` without touching the fetcher when there is no
    /// next page.
    pub async fn append_next_page(
        &mut self,
        fetcher: &dyn FeedFetcher,
    ) -> Result<Option<&Feed>, PageError> {
        let (token, url) = match self.begin_next_page() {
            Ok(claim) => claim,
            Err(PageError::NoMorePages) => return Ok(None),
            Err(e) => return Err(e),
        };
        let result = fetcher.fetch(&url).await;
        self.finish_next_page(token, result).map(Some)
    }

    // ========================================================================
    // Navigation targets
    // ========================================================================

    /// URL for a facet option, or the unfiltered feed when `value` is `None`.
    ///
    /// Path-only hrefs are placed on the scheme, host and port of the
    /// original URL. Filters from different facet groups are not combined.
    ///
    /// Clearing always yields this browser's `original_url`. The terminal UI
    /// only asks for it on an unfiltered view; a view that was itself opened
    /// from the filter menu is cleared by popping back to its parent, which
    /// shows the same unfiltered feed without fetching it again.
    pub fn select_facet_value(&self, facet: usize, value: Option<usize>) -> Option<Url> {
        let Some(value) = value else {
            return Some(self.original_url.clone());
        };
        let href = self
            .feed
            .as_ref()?
            .facets
            .get(facet)?
            .links
            .get(value)?
            .href
            .as_deref()?;
        facet_url(&self.original_url, href)
    }

    pub fn select_navigation_entry(&self, index: usize) -> Option<Url> {
        let href = self.feed.as_ref()?.navigation.get(index)?.href.as_deref()?;
        self.resolve(href)
    }

    pub fn select_group_more_link(&self, group: usize) -> Option<Url> {
        let href = self.feed.as_ref()?.groups.get(group)?.more_link()?.href.as_deref()?;
        self.resolve(href)
    }

    /// Target of a navigation or group row; publication rows have none.
    pub fn select_row(&self, section: usize, row: usize) -> Option<Url> {
        match self.row(section, row)? {
            Row::Navigation(_) => self.select_navigation_entry(row),
            Row::Group(_) => {
                let group = layout::group_index(self.mode, self.feed.as_ref()?, section)?;
                self.select_group_more_link(group)
            }
            Row::Publications(_) => None,
        }
    }

    fn resolve(&self, href: &str) -> Option<Url> {
        match self.current_url.join(href) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(href = href, error = %e, "Ignoring unresolvable link");
                None
            }
        }
    }

    // ========================================================================
    // Layout
    // ========================================================================

    pub fn section_count(&self) -> usize {
        self.feed
            .as_ref()
            .map_or(0, |f| layout::section_count(self.mode, f))
    }

    pub fn row_count(&self, section: usize) -> usize {
        self.feed
            .as_ref()
            .map_or(0, |f| layout::row_count(self.mode, f, section))
    }

    pub fn section_title(&self, section: usize) -> Option<&str> {
        layout::section_title(self.mode, self.feed.as_ref()?, section)
    }

    pub fn row_height(&self) -> RowHeight {
        layout::row_height(self.mode)
    }

    pub fn row(&self, section: usize, row: usize) -> Option<Row<'_>> {
        layout::row(self.mode, self.feed.as_ref()?, section, row)
    }

    /// Every `(section, row)` pair in display order.
    pub fn row_indices(&self) -> Vec<(usize, usize)> {
        (0..self.section_count())
            .flat_map(|s| (0..self.row_count(s)).map(move |r| (s, r)))
            .collect()
    }
}

fn resolve_next(base: &Url, feed: &Feed) -> Option<Url> {
    let href = feed.next_page_href()?;
    match base.join(href) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(href = href, error = %e, "Ignoring malformed next link");
            None
        }
    }
}

/// Places `href` on the origin of `original`; absolute hrefs pass through.
fn facet_url(original: &Url, href: &str) -> Option<Url> {
    let mut origin = original.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin.join(href).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Facet, Group, Link, NavigationEntry, Publication};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn link(href: &str) -> Link {
        Link {
            href: Some(href.to_string()),
            ..Default::default()
        }
    }

    fn next_link(href: &str) -> Link {
        Link {
            rel: vec!["next".to_string()],
            ..link(href)
        }
    }

    fn publication(title: &str) -> Publication {
        Publication {
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn loaded(url_str: &str, feed: Feed) -> FeedBrowser {
        let mut browser = FeedBrowser::new(url(url_str));
        browser.begin_load(&mut NullPresenter);
        browser.finish_load(Ok(feed), &mut NullPresenter);
        browser
    }

    struct NullPresenter;

    impl Presenter for NullPresenter {
        fn busy(&mut self, _: bool) {}
        fn feed_ready(&mut self, _: &FeedBrowser) {}
        fn load_failed(&mut self, _: &Url, _: &FetchError) {}
    }

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeedFetcher for CountingFetcher {
        async fn fetch(&self, _: &Url) -> Result<Feed, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Feed::default())
        }
    }

    #[test]
    fn test_new_browser_is_empty() {
        let browser = FeedBrowser::new(url("https://example.com/opds"));
        assert_eq!(browser.mode(), BrowsingMode::None);
        assert_eq!(browser.load_state(), &LoadState::Idle);
        assert_eq!(browser.section_count(), 0);
        assert!(browser.feed().is_none());
        assert_eq!(browser.title(), "https://example.com/opds");
    }

    #[test]
    fn test_facet_url_uses_original_origin() {
        let feed = Feed {
            facets: vec![Facet {
                title: "Genre".into(),
                links: vec![link("/books?filter=sci-fi"), link("https://mirror.example.org/x")],
            }],
            ..Default::default()
        };
        let browser = loaded("https://example.com/catalog", feed);

        assert_eq!(
            browser.select_facet_value(0, Some(0)),
            Some(url("https://example.com/books?filter=sci-fi"))
        );
        assert_eq!(
            browser.select_facet_value(0, Some(1)),
            Some(url("https://mirror.example.org/x"))
        );
        assert_eq!(
            browser.select_facet_value(0, None),
            Some(url("https://example.com/catalog"))
        );
        assert_eq!(browser.select_facet_value(0, Some(5)), None);
        assert_eq!(browser.select_facet_value(3, Some(0)), None);
    }

    #[test]
    fn test_facet_url_keeps_port() {
        let feed = Feed {
            facets: vec![Facet {
                title: "Sort".into(),
                links: vec![link("/opds/new?sort=title")],
            }],
            ..Default::default()
        };
        let browser = loaded("http://calibre.local:8080/opds", feed);
        assert_eq!(
            browser.select_facet_value(0, Some(0)),
            Some(url("http://calibre.local:8080/opds/new?sort=title"))
        );
    }

    #[test]
    fn test_navigation_and_more_links_resolve_relative() {
        let feed = Feed {
            navigation: vec![
                NavigationEntry {
                    title: "Fiction".into(),
                    href: Some("fiction.xml".into()),
                    number_of_items: Some(10),
                },
                NavigationEntry {
                    title: "Broken".into(),
                    href: None,
                    number_of_items: None,
                },
            ],
            groups: vec![Group {
                title: "Featured".into(),
                links: vec![link("/featured")],
                ..Default::default()
            }],
            ..Default::default()
        };
        let browser = loaded("https://example.com/opds/root.xml", feed);

        assert_eq!(
            browser.select_navigation_entry(0),
            Some(url("https://example.com/opds/fiction.xml"))
        );
        assert_eq!(browser.select_navigation_entry(1), None);
        assert_eq!(browser.select_navigation_entry(2), None);
        assert_eq!(
            browser.select_group_more_link(0),
            Some(url("https://example.com/featured"))
        );
        assert_eq!(browser.select_group_more_link(1), None);
    }

    #[test]
    fn test_select_row_dispatches_by_row_kind() {
        let feed = Feed {
            navigation: vec![NavigationEntry {
                title: "Authors".into(),
                href: Some("/authors".into()),
                number_of_items: None,
            }],
            groups: vec![
                Group {
                    title: "New".into(),
                    links: vec![link("/new")],
                    ..Default::default()
                },
                Group {
                    title: "Popular".into(),
                    links: vec![link("/popular")],
                    ..Default::default()
                },
            ],
            publications: vec![publication("Emma")],
            ..Default::default()
        };
        let browser = loaded("https://example.com/opds", feed);
        assert_eq!(browser.mode(), BrowsingMode::MixedNavigationGroupPublication);
        assert_eq!(browser.select_row(0, 0), Some(url("https://example.com/authors")));
        assert_eq!(browser.select_row(2, 0), Some(url("https://example.com/popular")));
        assert_eq!(browser.select_row(3, 0), None);
        assert_eq!(browser.row_indices(), vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn test_cursor_resolved_against_page_url() {
        let feed = Feed {
            publications: vec![publication("Emma")],
            links: vec![link("/self"), next_link("?page=2")],
            ..Default::default()
        };
        let mut browser = loaded("https://example.com/new", feed);
        assert_eq!(browser.next_page(), Some(&url("https://example.com/new?page=2")));

        let (token, page_url) = browser.begin_next_page().unwrap();
        let page = Feed {
            publications: vec![publication("Persuasion"), publication("Sanditon")],
            links: vec![next_link("?page=3")],
            ..Default::default()
        };
        let feed = browser.finish_next_page(token, Ok(page)).unwrap();
        let titles: Vec<&str> = feed.publications.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Emma", "Persuasion", "Sanditon"]);
        assert_eq!(browser.current_url(), &page_url);
        assert_eq!(browser.next_page(), Some(&url("https://example.com/new?page=3")));
    }

    #[test]
    fn test_page_guard() {
        let feed = Feed {
            publications: vec![publication("Emma")],
            links: vec![next_link("/p2")],
            ..Default::default()
        };
        let mut browser = loaded("https://example.com/new", feed);

        let (token, _) = browser.begin_next_page().unwrap();
        assert!(matches!(browser.begin_next_page(), Err(PageError::InFlight)));

        let err = browser
            .finish_next_page(token, Err(FetchError::HttpStatus(500)))
            .unwrap_err();
        assert!(matches!(err, PageError::Fetch(FetchError::HttpStatus(500))));
        assert!(!browser.is_page_in_flight());
        assert_eq!(browser.next_page(), Some(&url("https://example.com/p2")));
        assert_eq!(browser.feed().unwrap().publications.len(), 1);
    }

    #[test]
    fn test_unrequested_page_is_stale() {
        let mut browser = loaded("https://example.com/new", Feed::default());
        assert!(matches!(
            browser.finish_next_page(PageToken(1), Ok(Feed::default())),
            Err(PageError::Stale)
        ));
    }

    #[test]
    fn test_reload_discards_pending_page() {
        let feed = Feed {
            publications: vec![publication("Emma")],
            links: vec![next_link("/p2")],
            ..Default::default()
        };
        let mut browser = loaded("https://example.com/new", feed.clone());
        let (token, _) = browser.begin_next_page().unwrap();

        browser.begin_load(&mut NullPresenter);
        browser.finish_load(Ok(feed), &mut NullPresenter);

        let late = Feed {
            publications: vec![publication("Late")],
            ..Default::default()
        };
        assert!(matches!(
            browser.finish_next_page(token, Ok(late)),
            Err(PageError::Stale)
        ));
        assert_eq!(browser.feed().unwrap().publications.len(), 1);
    }

    #[test]
    fn test_late_page_cannot_answer_claim_made_after_reload() {
        let feed = Feed {
            publications: vec![publication("A")],
            links: vec![next_link("/p2")],
            ..Default::default()
        };
        let mut browser = loaded("https://example.com/new", feed.clone());
        let (old, _) = browser.begin_next_page().unwrap();

        browser.begin_load(&mut NullPresenter);
        browser.finish_load(Ok(feed), &mut NullPresenter);
        let (current, _) = browser.begin_next_page().unwrap();
        assert_ne!(old, current);

        // The fetch started before the reload finishes first
        let late = Feed {
            publications: vec![publication("stale-p2")],
            links: vec![next_link("/p3")],
            ..Default::default()
        };
        assert!(matches!(
            browser.finish_next_page(old, Ok(late)),
            Err(PageError::Stale)
        ));
        assert!(browser.is_page_in_flight());
        assert!(matches!(browser.begin_next_page(), Err(PageError::InFlight)));
        assert_eq!(browser.next_page(), Some(&url("https://example.com/p2")));

        let page = Feed {
            publications: vec![publication("p2")],
            ..Default::default()
        };
        let titles: Vec<&str> = browser
            .finish_next_page(current, Ok(page))
            .unwrap()
            .publications
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(titles, vec!["A", "p2"]);
    }

    #[test]
    fn test_cancel_ignores_other_claims() {
        let feed = Feed {
            publications: vec![publication("A")],
            links: vec![next_link("/p2")],
            ..Default::default()
        };
        let mut browser = loaded("https://example.com/new", feed.clone());
        let (old, _) = browser.begin_next_page().unwrap();
        browser.begin_load(&mut NullPresenter);
        browser.finish_load(Ok(feed), &mut NullPresenter);
        let (current, _) = browser.begin_next_page().unwrap();

        browser.cancel_next_page(old);
        assert!(browser.is_page_in_flight());
        browser.cancel_next_page(current);
        assert!(!browser.is_page_in_flight());
    }

    #[test]
    fn test_begin_next_page_before_load() {
        let mut browser = FeedBrowser::new(url("https://example.com/new"));
        assert!(matches!(browser.begin_next_page(), Err(PageError::NotLoaded)));
    }

    #[tokio::test]
    async fn test_append_without_cursor_skips_fetch() {
        let mut browser = loaded(
            "https://example.com/new",
            Feed {
                publications: vec![publication("Emma")],
                ..Default::default()
            },
        );
        let fetcher = CountingFetcher {
            calls: AtomicUsize::new(0),
        };
        let result = browser.append_next_page(&fetcher).await.unwrap();
        assert!(result.is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_append_does_not_reclassify() {
        let feed = Feed {
            navigation: vec![NavigationEntry {
                title: "All".into(),
                href: Some("/all".into()),
                number_of_items: None,
            }],
            links: vec![next_link("/p2")],
            ..Default::default()
        };
        let mut browser = loaded("https://example.com/", feed);
        assert_eq!(browser.mode(), BrowsingMode::Navigation);

        let (token, _) = browser.begin_next_page().unwrap();
        browser
            .finish_next_page(token, Ok(Feed {
                publications: vec![publication("Emma")],
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(browser.mode(), BrowsingMode::Navigation);
        assert_eq!(browser.next_page(), None);
    }
}
