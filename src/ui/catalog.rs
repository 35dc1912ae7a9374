//! Catalog body: sections and rows of the current feed.

use crate::app::{App, Item};
use crate::browser::{FeedBrowser, LoadState, Row, RowHeight};
use crate::catalog::{Group, Publication};
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Render the catalog panel for the current view.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let browser = app.browser();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(panel_title(browser, area.width));

    match browser.load_state() {
        LoadState::Idle | LoadState::Loading if browser.feed().is_none() => {
            let frame = SPINNER[app.spinner_frame % SPINNER.len()];
            let msg = format!("{} Loading {}", frame, browser.original_url());
            f.render_widget(Paragraph::new(msg).block(block), area);
            return;
        }
        LoadState::Failed(err) if browser.feed().is_none() => {
            let text = vec![
                Line::from(Span::styled(
                    "Could not load this catalog",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(strip_control_chars(err).into_owned()),
            ];
            f.render_widget(
                Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
                area,
            );
            return;
        }
        _ => {}
    }

    if browser.section_count() == 0 {
        f.render_widget(Paragraph::new("Nothing to show").block(block), area);
        return;
    }

    let inner_height = area.height.saturating_sub(2);
    let width = area.width.saturating_sub(4) as usize;
    let selected = app.view_state().selected;

    let mut list_items: Vec<ListItem> = Vec::new();
    let mut selected_index = None;
    let mut item_index = 0;

    for section in 0..browser.section_count() {
        if let Some(title) = browser.section_title(section) {
            list_items.push(section_header(title, width));
        }
        for row in 0..browser.row_count(section) {
            match browser.row(section, row) {
                Some(Row::Navigation(entry)) => {
                    if item_index == selected {
                        selected_index = Some(list_items.len());
                    }
                    item_index += 1;
                    let mut label = strip_control_chars(&entry.title).into_owned();
                    if let Some(n) = entry.number_of_items {
                        label.push_str(&format!(" ({})", n));
                    }
                    list_items.push(ListItem::new(format!(
                        "▸ {}",
                        truncate_to_width(&label, width.saturating_sub(2))
                    )));
                }
                Some(Row::Group(group)) => {
                    if item_index == selected {
                        selected_index = Some(list_items.len());
                    }
                    item_index += 1;
                    let lines = browser.row_height().lines(inner_height).max(1);
                    list_items.push(group_item(group, lines, width));
                }
                Some(Row::Publications(pubs)) => {
                    let detailed = browser.row_height() == RowHeight::FullPage;
                    for publication in pubs {
                        if item_index == selected {
                            selected_index = Some(list_items.len());
                        }
                        item_index += 1;
                        list_items.push(publication_item(publication, detailed, width));
                    }
                }
                None => {}
            }
        }
    }

    if browser.is_page_in_flight() {
        let frame = SPINNER[app.spinner_frame % SPINNER.len()];
        list_items.push(ListItem::new(Span::styled(
            format!("{} Loading more...", frame),
            Style::default().fg(Color::DarkGray),
        )));
    } else if browser.next_page().is_some() {
        list_items.push(ListItem::new(Span::styled(
            "More publications available",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let list = List::new(list_items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default().with_selected(selected_index);
    f.render_stateful_widget(list, area, &mut state);
}

fn panel_title(browser: &FeedBrowser, width: u16) -> String {
    let title = strip_control_chars(browser.title());
    let mut label = format!(" {} ", truncate_to_width(&title, width.saturating_sub(24) as usize));
    if let Some(feed) = browser.feed() {
        let loaded = feed.publications.len();
        match feed.metadata.number_of_items {
            Some(total) if loaded > 0 => label.push_str(&format!("[{}/{}] ", loaded, total)),
            _ if loaded > 0 => label.push_str(&format!("[{}] ", loaded)),
            _ => {}
        }
    }
    label
}

fn section_header(title: &str, width: usize) -> ListItem<'static> {
    let title = strip_control_chars(title);
    ListItem::new(Line::from(Span::styled(
        truncate_to_width(&title, width).into_owned(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )))
}

/// A group drawn as a strip: its "more" label followed by publication titles.
fn group_item(group: &Group, lines: u16, width: usize) -> ListItem<'static> {
    let more = group
        .more_link()
        .and_then(|l| l.title.clone())
        .unwrap_or_else(|| "See all".to_string());
    let mut text = vec![Line::from(Span::styled(
        format!("▸ {}", truncate_to_width(&strip_control_chars(&more), width.saturating_sub(2))),
        Style::default().fg(Color::Cyan),
    ))];

    let titles: Vec<String> = group
        .publications
        .iter()
        .map(|p| strip_control_chars(&p.title).into_owned())
        .chain(
            group
                .navigation
                .iter()
                .map(|n| strip_control_chars(&n.title).into_owned()),
        )
        .collect();

    // Pack titles side by side, one strip line at a time
    let lines = lines as usize;
    let mut line = String::new();
    for title in &titles {
        let entry = truncate_to_width(title, 24);
        if !line.is_empty() && line.width() + 3 + entry.width() > width.saturating_sub(2) {
            text.push(Line::from(format!("  {}", line)));
            line.clear();
            if text.len() >= lines {
                break;
            }
        }
        if !line.is_empty() {
            line.push_str(" │ ");
        }
        line.push_str(&entry);
    }
    if !line.is_empty() && text.len() < lines {
        text.push(Line::from(format!("  {}", line)));
    }

    ListItem::new(text)
}

fn publication_item(publication: &Publication, detailed: bool, width: usize) -> ListItem<'static> {
    let title = strip_control_chars(&publication.title);
    let byline = strip_control_chars(&publication.byline()).into_owned();

    if !detailed {
        let mut label = title.into_owned();
        if !byline.is_empty() {
            label.push_str(" · ");
            label.push_str(&byline);
        }
        return ListItem::new(truncate_to_width(&label, width).into_owned());
    }

    let mut meta = byline;
    if let Some(published) = publication.published {
        if !meta.is_empty() {
            meta.push_str("  ");
        }
        meta.push_str(&published.format("%Y-%m-%d").to_string());
    }

    ListItem::new(vec![
        Line::from(Span::styled(
            truncate_to_width(&title, width).into_owned(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("  {}", truncate_to_width(&meta, width.saturating_sub(2))),
            Style::default().fg(Color::Gray),
        )),
    ])
}

/// Selected item description for the header breadcrumb.
pub(super) fn selection_label(app: &App) -> Option<String> {
    let browser = app.browser();
    match app.selected_item()? {
        Item::Row { section, row } => match browser.row(section, row)? {
            Row::Navigation(entry) => Some(entry.title.clone()),
            Row::Group(group) => Some(group.title.clone()),
            Row::Publications(_) => None,
        },
        Item::Publication { index, .. } => browser
            .feed()?
            .publications
            .get(index)
            .map(|p| p.title.clone()),
    }
}
