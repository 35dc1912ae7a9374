use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::browser::{FeedBrowser, NavigationStack, PageToken, Presenter, Row, ViewId};
use crate::catalog::Feed;
use crate::fetch::{FeedFetcher, FetchError};
use crate::keybindings::{Context, KeybindingRegistry};

/// How long a status message stays visible.
const STATUS_TTL: Duration = Duration::from_secs(5);

// ============================================================================
// Events
// ============================================================================

/// Events from background tasks.
pub enum AppEvent {
    /// Initial (or refreshed) feed for a view.
    FeedLoaded {
        view: ViewId,
        result: Result<Feed, FetchError>,
    },
    /// Next page for a view, answering the claim `token`.
    PageLoaded {
        view: ViewId,
        token: PageToken,
        result: Result<Feed, FetchError>,
    },
    /// A background task panicked.
    ///
    /// Fields:
    /// - `task`: Name of the task that panicked ("feed_load", "page_load")
    /// - `view`: View the task was working for
    /// - `page`: The page claim the task held, for "page_load"
    /// - `error`: The panic message extracted from the panic payload
    TaskPanicked {
        task: &'static str,
        view: ViewId,
        page: Option<PageToken>,
        error: String,
    },
}

// ============================================================================
// Status line presenter
// ============================================================================

/// The status bar, and the [`Presenter`] every browser reports to.
#[derive(Debug, Default)]
pub struct StatusLine {
    message: Option<(String, Instant)>,
    /// Fetches currently in flight across all views.
    busy: usize,
}

impl StatusLine {
    pub fn set(&mut self, msg: impl Into<String>) {
        self.message = Some((msg.into(), Instant::now()));
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(|(m, _)| m.as_str())
    }

    pub fn is_busy(&self) -> bool {
        self.busy > 0
    }

    /// Drops an expired message. Returns true if one was cleared.
    pub fn clear_expired(&mut self) -> bool {
        match &self.message {
            Some((_, at)) if at.elapsed() >= STATUS_TTL => {
                self.message = None;
                true
            }
            _ => false,
        }
    }
}

impl Presenter for StatusLine {
    fn busy(&mut self, busy: bool) {
        if busy {
            self.busy += 1;
        } else {
            self.busy = self.busy.saturating_sub(1);
        }
    }

    fn feed_ready(&mut self, browser: &FeedBrowser) {
        let count = browser.feed().map_or(0, |f| {
            f.navigation.len() + f.groups.len() + f.publications.len()
        });
        self.set(format!(
            "{} ({} entries, {})",
            browser.title(),
            count,
            browser.mode().label()
        ));
    }

    fn load_failed(&mut self, url: &Url, error: &FetchError) {
        let mut msg = format!("Failed to load {}: {}", url, error);
        if let Some(hint) = error.hint() {
            msg.push_str(&format!(" ({})", hint));
        }
        self.set(msg);
    }
}

// ============================================================================
// View state
// ============================================================================

/// A selectable line in the catalog view.
///
/// Publication rows are expanded into one item per publication so each
/// can be selected on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    Row { section: usize, row: usize },
    Publication { section: usize, index: usize },
}

/// Flattens a browser's rows into selectable items, in display order.
pub fn items(browser: &FeedBrowser) -> Vec<Item> {
    let mut items = Vec::new();
    for (section, row) in browser.row_indices() {
        match browser.row(section, row) {
            Some(Row::Publications(pubs)) => {
                items.extend((0..pubs.len()).map(|index| Item::Publication { section, index }));
            }
            Some(Row::Navigation(_)) | Some(Row::Group(_)) => {
                items.push(Item::Row { section, row });
            }
            None => {}
        }
    }
    items
}

/// UI-only state kept per pushed view.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub selected: usize,
    /// The view was opened from the filter menu.
    pub filtered: bool,
}

/// Popups drawn over the catalog view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    Help { scroll: usize },
    /// Facet options flattened across facet groups.
    Filter { selected: usize },
    /// Details of one publication and its acquisition links.
    Detail { publication: usize, link: usize },
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub stack: NavigationStack,
    /// Parallel to the stack, root first.
    pub views: Vec<ViewState>,
    pub fetcher: Arc<dyn FeedFetcher>,
    pub keybindings: KeybindingRegistry,
    pub status: StatusLine,
    pub overlay: Overlay,
    pub needs_redraw: bool,
    pub spinner_frame: usize,
}

impl App {
    pub fn new(root: Url, fetcher: Arc<dyn FeedFetcher>, keybindings: KeybindingRegistry) -> Self {
        Self {
            stack: NavigationStack::new(root),
            views: vec![ViewState::default()],
            fetcher,
            keybindings,
            status: StatusLine::default(),
            overlay: Overlay::None,
            needs_redraw: true,
            spinner_frame: 0,
        }
    }

    pub fn browser(&self) -> &FeedBrowser {
        &self.stack.current().browser
    }

    pub fn view_id(&self) -> ViewId {
        self.stack.current().id
    }

    pub fn view_state(&self) -> &ViewState {
        // views and stack are pushed and popped together
        let depth = self.stack.depth();
        &self.views[depth - 1]
    }

    pub fn view_state_mut(&mut self) -> &mut ViewState {
        let depth = self.stack.depth();
        &mut self.views[depth - 1]
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status.set(msg);
    }

    /// Keybinding context for the active overlay.
    pub fn context(&self) -> Context {
        match self.overlay {
            Overlay::None => Context::Catalog,
            Overlay::Help { .. } => Context::Global,
            Overlay::Filter { .. } => Context::Filter,
            Overlay::Detail { .. } => Context::Detail,
        }
    }

    pub fn push_view(&mut self, url: Url, filtered: bool) -> ViewId {
        let id = self.stack.push(url);
        self.views.push(ViewState {
            selected: 0,
            filtered,
        });
        self.overlay = Overlay::None;
        id
    }

    /// Returns false at the root.
    pub fn pop_view(&mut self) -> bool {
        if self.stack.pop().is_some() {
            self.views.pop();
            self.overlay = Overlay::None;
            true
        } else {
            false
        }
    }

    pub fn current_items(&self) -> Vec<Item> {
        items(self.browser())
    }

    pub fn selected_item(&self) -> Option<Item> {
        self.current_items().get(self.view_state().selected).copied()
    }

    /// Keeps the selection inside the current item list.
    pub fn clamp_selection(&mut self) {
        let len = self.current_items().len();
        let state = self.view_state_mut();
        state.selected = state.selected.min(len.saturating_sub(1));
    }

    /// Facet options of the current feed as (facet, value) pairs.
    pub fn facet_options(&self) -> Vec<(usize, usize)> {
        self.browser()
            .feed()
            .map(|feed| {
                feed.facets
                    .iter()
                    .enumerate()
                    .flat_map(|(f, facet)| (0..facet.links.len()).map(move |v| (f, v)))
                    .collect()
            })
            .unwrap_or_default()
    }
}
