use crate::app::{App, Overlay};
use crate::keybindings::{Action as KbAction, Context as KbContext};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    // EDGE-001: Guard against zero-width/height areas
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = match app.status.message() {
        Some(msg) if app.status.is_busy() => Cow::Owned(format!(
            "{} {}",
            SPINNER[app.spinner_frame % SPINNER.len()],
            msg
        )),
        Some(msg) => Cow::Borrowed(msg),
        None if app.status.is_busy() => Cow::Owned(format!(
            "{} Loading...",
            SPINNER[app.spinner_frame % SPINNER.len()]
        )),
        None => Cow::Owned(hints(app)),
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), area);
}

/// Key hints for the active context, built from the live bindings.
fn hints(app: &App) -> String {
    let actions: &[KbAction] = match app.overlay {
        Overlay::None => &[
            KbAction::Select,
            KbAction::Back,
            KbAction::LoadMore,
            KbAction::Filter,
            KbAction::Refresh,
            KbAction::ShowHelp,
            KbAction::Quit,
        ],
        Overlay::Filter { .. } => &[KbAction::Select, KbAction::ClearFilter, KbAction::Back],
        Overlay::Detail { .. } => &[KbAction::Open, KbAction::Back],
        Overlay::Help { .. } => &[KbAction::NavDown, KbAction::NavUp],
    };
    let context = app.context();

    actions
        .iter()
        .filter(|a| **a != KbAction::Filter || app.browser().has_facets())
        .filter_map(|a| {
            let ctx = if *a == KbAction::Quit {
                KbContext::Global
            } else {
                context
            };
            app.keybindings
                .key_hint(*a, ctx)
                .map(|key| format!("[{}] {}", key, hint_label(*a)))
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn hint_label(action: KbAction) -> &'static str {
    match action {
        KbAction::Select => "open",
        KbAction::Back => "back",
        KbAction::LoadMore => "more",
        KbAction::Filter => "filter",
        KbAction::ClearFilter => "clear",
        KbAction::Refresh => "reload",
        KbAction::ShowHelp => "help",
        KbAction::Quit => "quit",
        KbAction::Open => "download",
        KbAction::NavDown => "down",
        KbAction::NavUp => "up",
        KbAction::PageDown | KbAction::PageUp => "page",
    }
}
