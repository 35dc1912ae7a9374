//! Publication detail popup.
//!
//! Shows the publication's metadata and lets the user pick one of its
//! acquisition links to open.

use crate::app::App;
use crate::catalog::Link;
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::help::centered_rect;

pub fn render(f: &mut Frame, app: &App, publication: usize, link: usize) {
    let Some(publication) = app
        .browser()
        .feed()
        .and_then(|feed| feed.publications.get(publication))
    else {
        return;
    };

    let overlay = centered_rect(80, 80, f.area());
    if overlay.width < 24 || overlay.height < 8 {
        return;
    }
    f.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Publication ");
    let inner = block.inner(overlay);
    f.render_widget(block, overlay);

    let acquisitions: Vec<&Link> = publication.acquisition_links().collect();
    let links_height = (acquisitions.len() as u16 + 2).clamp(3, inner.height / 2);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(links_height)])
        .split(inner);

    let mut text = vec![Line::from(Span::styled(
        strip_control_chars(&publication.title).into_owned(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    let byline = publication.byline();
    if !byline.is_empty() {
        text.push(Line::from(Span::styled(
            strip_control_chars(&byline).into_owned(),
            Style::default().fg(Color::Gray),
        )));
    }
    if let Some(published) = publication.published {
        text.push(Line::from(Span::styled(
            published.format("%B %-d, %Y").to_string(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    if let Some(summary) = &publication.summary {
        text.push(Line::from(""));
        text.push(Line::from(strip_control_chars(summary).into_owned()));
    }
    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), chunks[0]);

    let width = chunks[1].width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = if acquisitions.is_empty() {
        vec![ListItem::new("No acquisition links")]
    } else {
        acquisitions
            .iter()
            .map(|l| ListItem::new(truncate_to_width(&link_label(l), width).into_owned()))
            .collect()
    };
    let selected = (!acquisitions.is_empty()).then_some(link);
    let list = List::new(items)
        .block(Block::default().borders(Borders::TOP).title(" Links "))
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default().with_selected(selected);
    f.render_stateful_widget(list, chunks[1], &mut state);
}

/// "Title (media type)", falling back to the relation when untitled.
fn link_label(link: &Link) -> String {
    let name = link
        .title
        .as_deref()
        .map(|t| strip_control_chars(t).into_owned())
        .or_else(|| {
            link.rel
                .iter()
                .find_map(|r| r.rsplit('/').next())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "download".to_string());
    match &link.media_type {
        Some(media) => format!("{} ({})", name, media),
        None => name,
    }
}
