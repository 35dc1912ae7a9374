//! Keyboard input handling.

use crate::app::{App, AppEvent, Item, Overlay};
use crate::browser::PageError;
use crate::keybindings::Action as KbAction;
use crate::util::validate_url_for_open;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{start_load, start_next_page};
use super::Action;

/// Rows moved by PageUp/PageDown.
const PAGE_STEP: isize = 10;

/// Handle a key press.
///
/// The key is resolved against the context of the active overlay, falling
/// back to global bindings.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    let action = app.keybindings.action_for_key(code, modifiers, app.context());

    if action == Some(KbAction::Quit) {
        return Ok(Action::Quit);
    }

    match app.overlay.clone() {
        Overlay::Help { scroll } => handle_help(app, action, scroll),
        Overlay::Filter { selected } => {
            if let Some(action) = action {
                handle_filter(app, action, selected, tx);
            }
        }
        Overlay::Detail { publication, link } => {
            if let Some(action) = action {
                handle_detail(app, action, publication, link);
            }
        }
        Overlay::None => {
            if let Some(action) = action {
                handle_catalog(app, action, tx);
            }
        }
    }

    Ok(Action::Continue)
}

fn step(action: KbAction) -> Option<isize> {
    match action {
        KbAction::NavDown => Some(1),
        KbAction::NavUp => Some(-1),
        KbAction::PageDown => Some(PAGE_STEP),
        KbAction::PageUp => Some(-PAGE_STEP),
        _ => None,
    }
}

fn moved(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    current.saturating_add_signed(delta).min(len - 1)
}

// ============================================================================
// Catalog view
// ============================================================================

fn handle_catalog(app: &mut App, action: KbAction, tx: &mpsc::Sender<AppEvent>) {
    if let Some(delta) = step(action) {
        let len = app.current_items().len();
        let state = app.view_state_mut();
        state.selected = moved(state.selected, delta, len);
        let at_end = len > 0 && state.selected == len - 1;

        // Reaching the bottom pulls in the next page
        let browser = app.browser();
        if at_end && browser.next_page().is_some() && !browser.is_page_in_flight() {
            if let Err(e) = start_next_page(app, tx) {
                tracing::debug!(error = %e, "Automatic next page skipped");
            }
        }
        return;
    }

    match action {
        KbAction::Select => select_item(app, tx),
        KbAction::Back => {
            if app.pop_view() {
                app.clamp_selection();
            } else {
                app.set_status("Already at the catalog root");
            }
        }
        KbAction::LoadMore => match start_next_page(app, tx) {
            Ok(()) => app.set_status("Loading next page..."),
            Err(PageError::NoMorePages) => app.set_status("No more pages"),
            Err(PageError::InFlight) => app.set_status("Next page is already loading"),
            Err(PageError::NotLoaded) => app.set_status("Feed is still loading"),
            Err(e) => app.set_status(format!("Cannot load next page: {}", e)),
        },
        KbAction::Filter => {
            if app.browser().has_facets() {
                let selected = active_facet_option(app).unwrap_or(0);
                app.overlay = Overlay::Filter { selected };
            } else {
                app.set_status("This feed has no filters");
            }
        }
        KbAction::Refresh => {
            start_load(app, tx, true);
            app.set_status(format!("Reloading {}", app.browser().original_url()));
        }
        KbAction::ShowHelp => app.overlay = Overlay::Help { scroll: 0 },
        _ => {}
    }
}

fn select_item(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    match app.selected_item() {
        Some(Item::Row { section, row }) => match app.browser().select_row(section, row) {
            Some(url) => {
                app.push_view(url, false);
                start_load(app, tx, false);
            }
            None => app.set_status("This entry has no link"),
        },
        Some(Item::Publication { index, .. }) => {
            app.overlay = Overlay::Detail {
                publication: index,
                link: 0,
            };
        }
        None => {}
    }
}

/// Position of the server-flagged active option in the flattened list.
fn active_facet_option(app: &App) -> Option<usize> {
    let feed = app.browser().feed()?;
    app.facet_options()
        .iter()
        .position(|&(f, v)| feed.facets[f].links[v].active)
}

// ============================================================================
// Overlays
// ============================================================================

fn handle_help(app: &mut App, action: Option<KbAction>, scroll: usize) {
    match action.and_then(step) {
        Some(delta) => {
            app.overlay = Overlay::Help {
                scroll: scroll.saturating_add_signed(delta),
            };
        }
        // Any other key closes help
        None => app.overlay = Overlay::None,
    }
}

fn handle_filter(app: &mut App, action: KbAction, selected: usize, tx: &mpsc::Sender<AppEvent>) {
    let options = app.facet_options();

    if let Some(delta) = step(action) {
        app.overlay = Overlay::Filter {
            selected: moved(selected, delta, options.len()),
        };
        return;
    }

    match action {
        KbAction::Select => {
            let Some(&(facet, value)) = options.get(selected) else {
                return;
            };
            match app.browser().select_facet_value(facet, Some(value)) {
                Some(url) => {
                    app.push_view(url, true);
                    start_load(app, tx, false);
                }
                None => app.set_status("This filter has no link"),
            }
        }
        KbAction::ClearFilter => {
            if app.view_state().filtered {
                app.pop_view();
                app.clamp_selection();
            } else if let Some(url) = app.browser().select_facet_value(0, None) {
                app.push_view(url, false);
                start_load(app, tx, false);
            }
        }
        KbAction::Back => app.overlay = Overlay::None,
        KbAction::ShowHelp => app.overlay = Overlay::Help { scroll: 0 },
        _ => {}
    }
}

fn handle_detail(app: &mut App, action: KbAction, publication: usize, link: usize) {
    let hrefs: Vec<String> = app
        .browser()
        .feed()
        .and_then(|f| f.publications.get(publication))
        .map(|p| {
            p.acquisition_links()
                .filter_map(|l| l.href.clone())
                .collect()
        })
        .unwrap_or_default();

    if let Some(delta) = step(action) {
        app.overlay = Overlay::Detail {
            publication,
            link: moved(link, delta, hrefs.len()),
        };
        return;
    }

    match action {
        KbAction::Open => {
            let Some(href) = hrefs.get(link) else {
                app.set_status("No acquisition link");
                return;
            };
            let target = match app.browser().current_url().join(href) {
                Ok(url) => url,
                Err(e) => {
                    app.set_status(format!("Invalid link: {}", e));
                    return;
                }
            };
            // SEC: Validate URL before open::that() to prevent command injection
            if let Err(e) = validate_url_for_open(target.as_str()) {
                app.set_status(e);
            } else if let Err(e) = open::that(target.as_str()) {
                tracing::warn!(url = %target, error = %e, "Failed to open link");
                app.set_status(format!("Failed to open link: {}", e));
            } else {
                app.set_status(format!("Opened {}", target));
            }
        }
        KbAction::Back | KbAction::Select => app.overlay = Overlay::None,
        KbAction::ShowHelp => app.overlay = Overlay::Help { scroll: 0 },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Facet, Feed, Link, NavigationEntry, Publication};
    use crate::fetch::{FeedFetcher, FetchError};
    use crate::keybindings::KeybindingRegistry;
    use async_trait::async_trait;
    use std::sync::Arc;
    use url::Url;

    struct NoFetch;

    #[async_trait]
    impl FeedFetcher for NoFetch {
        async fn fetch(&self, _: &Url) -> Result<Feed, FetchError> {
            Err(FetchError::Timeout)
        }
    }

    fn app_with(feed: Feed) -> App {
        let mut app = App::new(
            Url::parse("https://example.com/opds").unwrap(),
            Arc::new(NoFetch),
            KeybindingRegistry::new(),
        );
        let browser = &mut app.stack.current_mut().browser;
        browser.begin_load(&mut app.status);
        browser.finish_load(Ok(feed), &mut app.status);
        app
    }

    fn key(app: &mut App, c: char, tx: &mpsc::Sender<AppEvent>) -> Action {
        handle_input(app, KeyCode::Char(c), KeyModifiers::NONE, tx).unwrap()
    }

    fn link(href: &str) -> Link {
        Link {
            href: Some(href.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_moved_clamps() {
        assert_eq!(moved(0, -1, 5), 0);
        assert_eq!(moved(3, 10, 5), 4);
        assert_eq!(moved(2, 1, 0), 0);
    }

    #[tokio::test]
    async fn test_quit() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = app_with(Feed::default());
        assert!(matches!(key(&mut app, 'q', &tx), Action::Quit));
    }

    #[tokio::test]
    async fn test_select_navigation_pushes_view() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = app_with(Feed {
            navigation: vec![
                NavigationEntry {
                    title: "New".into(),
                    href: Some("/new".into()),
                    number_of_items: None,
                },
                NavigationEntry {
                    title: "Popular".into(),
                    href: Some("/popular".into()),
                    number_of_items: None,
                },
            ],
            ..Default::default()
        });

        key(&mut app, 'j', &tx);
        handle_input(&mut app, KeyCode::Enter, KeyModifiers::NONE, &tx).unwrap();
        assert_eq!(app.stack.depth(), 2);
        assert_eq!(app.browser().original_url().as_str(), "https://example.com/popular");
        assert!(app.status.is_busy());

        handle_input(&mut app, KeyCode::Esc, KeyModifiers::NONE, &tx).unwrap();
        assert_eq!(app.stack.depth(), 1);
        assert_eq!(app.view_state().selected, 1);
    }

    #[tokio::test]
    async fn test_filter_menu_flow() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = app_with(Feed {
            publications: vec![Publication::default()],
            facets: vec![Facet {
                title: "Language".into(),
                links: vec![link("/opds?lang=en"), link("/opds?lang=fr")],
            }],
            ..Default::default()
        });

        key(&mut app, 'f', &tx);
        assert_eq!(app.overlay, Overlay::Filter { selected: 0 });
        key(&mut app, 'j', &tx);
        handle_input(&mut app, KeyCode::Enter, KeyModifiers::NONE, &tx).unwrap();
        assert_eq!(app.browser().original_url().as_str(), "https://example.com/opds?lang=fr");
        assert!(app.view_state().filtered);
        assert_eq!(app.overlay, Overlay::None);

        // Clearing a filter applied from this app returns to the unfiltered view
        app.overlay = Overlay::Filter { selected: 0 };
        key(&mut app, 'c', &tx);
        assert_eq!(app.stack.depth(), 1);
    }

    #[tokio::test]
    async fn test_filter_without_facets() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = app_with(Feed::default());
        key(&mut app, 'f', &tx);
        assert_eq!(app.overlay, Overlay::None);
        assert_eq!(app.status.message(), Some("This feed has no filters"));
    }

    #[tokio::test]
    async fn test_load_more_without_cursor() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = app_with(Feed::default());
        key(&mut app, 'n', &tx);
        assert_eq!(app.status.message(), Some("No more pages"));
    }

    #[tokio::test]
    async fn test_publication_opens_detail() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = app_with(Feed {
            publications: vec![Publication {
                title: "Emma".into(),
                ..Default::default()
            }],
            ..Default::default()
        });
        handle_input(&mut app, KeyCode::Enter, KeyModifiers::NONE, &tx).unwrap();
        assert_eq!(
            app.overlay,
            Overlay::Detail {
                publication: 0,
                link: 0
            }
        );
        key(&mut app, 'o', &tx);
        assert_eq!(app.status.message(), Some("No acquisition link"));
        handle_input(&mut app, KeyCode::Esc, KeyModifiers::NONE, &tx).unwrap();
        assert_eq!(app.overlay, Overlay::None);
    }

    #[tokio::test]
    async fn test_help_closes_on_other_key() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = app_with(Feed::default());
        key(&mut app, '?', &tx);
        assert_eq!(app.overlay, Overlay::Help { scroll: 0 });
        key(&mut app, 'j', &tx);
        assert_eq!(app.overlay, Overlay::Help { scroll: 1 });
        key(&mut app, 'x', &tx);
        assert_eq!(app.overlay, Overlay::None);
    }
}
