//! Render functions for the TUI.
//!
//! Draws the breadcrumb header, the catalog body and the status bar, then
//! whichever overlay is open on top.

use crate::app::{App, Overlay};
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::{catalog, detail, facets, help, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 8;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    // EDGE-001: Guard against zero-width/height to prevent panics
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    catalog::render(f, app, chunks[1]);
    status::render(f, app, chunks[2]);

    match app.overlay {
        Overlay::None => {}
        Overlay::Help { scroll } => help::render(f, app, scroll),
        Overlay::Filter { selected } => facets::render(f, app, selected),
        Overlay::Detail { publication, link } => detail::render(f, app, publication, link),
    }
}

/// Breadcrumb of view titles, root first, trimmed from the left when long.
fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<String> = app
        .stack
        .iter()
        .map(|view| strip_control_chars(view.browser.title()).into_owned())
        .collect();

    let width = area.width as usize;
    let mut crumbs = titles.join(" › ");
    if let Some(label) = catalog::selection_label(app) {
        crumbs.push_str(" › ");
        crumbs.push_str(&strip_control_chars(&label));
    }

    // Keep the deepest part visible
    let mut shown = truncate_to_width(&crumbs, width).into_owned();
    if shown != crumbs {
        let tail: String = crumbs
            .chars()
            .rev()
            .take(width.saturating_sub(4))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        shown = truncate_to_width(&format!("... {}", tail), width).into_owned();
    }

    let line = Line::from(Span::styled(
        shown,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    f.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Feed, NavigationEntry};
    use crate::fetch::{FeedFetcher, FetchError};
    use crate::keybindings::KeybindingRegistry;
    use async_trait::async_trait;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use url::Url;

    struct NoFetch;

    #[async_trait]
    impl FeedFetcher for NoFetch {
        async fn fetch(&self, _: &Url) -> Result<Feed, FetchError> {
            Err(FetchError::Timeout)
        }
    }

    fn screen(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn loaded_app() -> App {
        let mut app = App::new(
            Url::parse("https://example.com/opds").unwrap(),
            Arc::new(NoFetch),
            KeybindingRegistry::new(),
        );
        let feed = Feed {
            navigation: vec![NavigationEntry {
                title: "Popular".into(),
                href: Some("/popular".into()),
                number_of_items: Some(12),
            }],
            ..Default::default()
        };
        let browser = &mut app.stack.current_mut().browser;
        browser.begin_load(&mut app.status);
        browser.finish_load(Ok(feed), &mut app.status);
        app
    }

    #[test]
    fn test_too_small() {
        let app = loaded_app();
        assert!(screen(&app, 30, 5).contains("too small"));
    }

    #[test]
    fn test_catalog_rows_and_breadcrumb() {
        let app = loaded_app();
        let out = screen(&app, 60, 12);
        assert!(out.contains("Popular (12)"));
        assert!(out.contains("https://example.com/opds › Popular"));
    }

    #[test]
    fn test_help_overlay_lists_bindings() {
        let mut app = loaded_app();
        app.overlay = Overlay::Help { scroll: 0 };
        let out = screen(&app, 80, 40);
        assert!(out.contains("Load next page"));
    }
}
