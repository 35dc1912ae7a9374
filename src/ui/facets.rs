//! Filter menu overlay listing the feed's facet groups.

use crate::app::App;
use crate::keybindings::{Action as KbAction, Context as KbContext};
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState},
    Frame,
};

use super::help::centered_rect;

pub fn render(f: &mut Frame, app: &App, selected: usize) {
    let Some(feed) = app.browser().feed() else {
        return;
    };

    let overlay = centered_rect(60, 70, f.area());
    if overlay.width < 20 || overlay.height < 5 {
        return;
    }
    f.render_widget(Clear, overlay);

    let width = overlay.width.saturating_sub(4) as usize;
    let mut items: Vec<ListItem> = Vec::new();
    let mut selected_index = None;
    let mut option = 0;

    for facet in &feed.facets {
        items.push(ListItem::new(Line::from(Span::styled(
            truncate_to_width(&strip_control_chars(&facet.title), width).into_owned(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))));

        for link in &facet.links {
            if option == selected {
                selected_index = Some(items.len());
            }
            option += 1;

            let mut label = link
                .title
                .as_deref()
                .map(|t| strip_control_chars(t).into_owned())
                .or_else(|| link.href.clone())
                .unwrap_or_default();
            if let Some(n) = link.number_of_items {
                label.push_str(&format!(" ({})", n));
            }
            let marker = if link.active { "● " } else { "  " };
            let style = if link.active {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            items.push(ListItem::new(Span::styled(
                format!("{}{}", marker, truncate_to_width(&label, width.saturating_sub(2))),
                style,
            )));
        }
    }

    let title = match app.keybindings.key_hint(KbAction::ClearFilter, KbContext::Filter) {
        Some(key) => format!(" Filter ({} clears) ", key),
        None => " Filter ".to_string(),
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default().with_selected(selected_index);
    f.render_stateful_widget(list, overlay, &mut state);
}

