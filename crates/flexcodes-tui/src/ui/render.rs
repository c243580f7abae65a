use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use flexcodes_core::render::MapLinks;
use flexcodes_core::utils::truncate;
use flexcodes_core::LoadStatus;

use crate::app::{App, AppState, Row};

use super::styles;

const APP_TITLE: &str = "Flex Codes";

/// Shown in place of the list when nothing matches
const NO_MATCHES: &str = "No matches.";

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Length(1), // Filter chips
            Constraint::Length(3), // Search
            Constraint::Min(6),    // List + detail
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_filter_chips(frame, app, chunks[1]);
    render_search_bar(frame, app, chunks[2]);
    render_main_content(frame, app, chunks[3]);
    render_status_bar(frame, app, chunks[4]);

    if let Some(toast) = &app.toast {
        render_toast(frame, &toast.message);
    }

    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let summary = app.filtered().summary();
    let status = app.status.to_string();
    let status_style = if app.status == LoadStatus::Error {
        styles::error_style()
    } else {
        styles::muted_style()
    };

    let (title_style, bar_style) = if app.is_scrolled() {
        (styles::compact_title_style(), styles::compact_title_style())
    } else {
        (styles::title_style(), Style::default())
    };

    let left = format!("  {}", APP_TITLE);
    let right = format!("{} · {}  ", summary, status);
    let padding = (area.width as usize)
        .saturating_sub(left.chars().count())
        .saturating_sub(right.chars().count());

    let title_line = Line::from(vec![
        Span::styled(left, title_style),
        Span::raw(" ".repeat(padding)),
        Span::styled(format!("{} · ", summary), styles::muted_style()),
        Span::styled(format!("{}  ", status), status_style),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block).style(bar_style);
    frame.render_widget(paragraph, area);
}

fn render_filter_chips(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, filter) in app.filters.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let selected = *filter == app.filter;
        let label = format!(" {} {} ", i + 1, filter.label());
        spans.push(Span::styled(label, styles::chip_style(selected)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_search_bar(frame: &mut Frame, app: &App, area: Rect) {
    let searching = matches!(app.state, AppState::Searching);
    let text = if app.search_query.is_empty() && !searching {
        Span::styled("Search community, address or code", styles::muted_style())
    } else {
        Span::styled(app.search_query.clone(), styles::search_style())
    };

    let mut spans = vec![Span::styled(" / ", styles::muted_style()), text];
    if searching {
        spans.push(Span::styled("█", styles::search_style()));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(searching));

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_list(frame, app, chunks[0]);
    render_detail(frame, app, chunks[1]);
}

fn render_list(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(" {} ", app.filter.label()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(!matches!(app.state, AppState::Searching)));

    if let Some(placeholder) = &app.placeholder {
        let paragraph = Paragraph::new(Span::styled(placeholder.clone(), styles::error_style()))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let rows = app.visible_rows();
    if rows.is_empty() {
        let message = if app.loading { "Loading…" } else { NO_MATCHES };
        let paragraph = Paragraph::new(Span::styled(message, styles::muted_style())).block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let (line, style) = match row {
                Row::Header {
                    community,
                    count,
                    collapsed,
                } => {
                    let chevron = if *collapsed { "▸" } else { "▾" };
                    let line = Line::from(vec![
                        Span::raw(format!("{} ", chevron)),
                        Span::raw(truncate(community, width.saturating_sub(8))),
                        Span::styled(format!(" {}", count), styles::muted_style()),
                    ]);
                    (line, styles::group_header_style())
                }
                Row::Item(record) => {
                    let gate = record.gate_label();
                    let address_width = width.saturating_sub(gate.chars().count() + 5);
                    let line = Line::from(vec![
                        Span::raw(format!("  {:<w$}", truncate(&record.address, address_width), w = address_width)),
                        Span::raw(" "),
                        Span::styled(
                            gate.to_string(),
                            if record.has_gate() {
                                styles::highlight_style()
                            } else {
                                styles::muted_style()
                            },
                        ),
                    ]);
                    (line, styles::list_item_style())
                }
            };
            let style = if i == app.selection {
                styles::selected_style()
            } else {
                style
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let list = List::new(items).block(block);

    let mut state = ListState::default();
    state.select(Some(app.selection));

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Details ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let lines = match app.selected_row() {
        Some(Row::Item(record)) => {
            let links = MapLinks::for_address(&record.address);
            vec![
                Line::from(Span::styled(record.address.clone(), styles::title_style())),
                Line::from(Span::styled(record.community.clone(), styles::muted_style())),
                Line::from(""),
                Line::from(vec![
                    Span::styled("Type: ", styles::highlight_style()),
                    Span::raw(record.kind.clone()),
                ]),
                Line::from(vec![
                    Span::styled("Gate: ", styles::highlight_style()),
                    Span::raw(record.gate_label().to_string()),
                ]),
                Line::from(""),
                Line::from(Span::styled("Maps", styles::highlight_style())),
                Line::from(links.maps),
                Line::from(""),
                Line::from(Span::styled("Street View", styles::highlight_style())),
                Line::from(links.street_view),
            ]
        }
        Some(Row::Header {
            community,
            count,
            collapsed,
        }) => vec![
            Line::from(Span::styled(community.to_string(), styles::title_style())),
            Line::from(Span::styled(
                format!("{} {}", count, if count == 1 { "location" } else { "locations" }),
                styles::muted_style(),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("Enter", styles::help_key_style()),
                Span::styled(
                    if collapsed { " to expand" } else { " to collapse" },
                    styles::muted_style(),
                ),
            ]),
        ],
        None => vec![Line::from(Span::styled("Nothing selected", styles::muted_style()))],
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = format!(" {} ", app.dataset_name());
    let right_text = " [/] search | [r]eload | [?] help | [q]uit ";

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn render_toast(frame: &mut Frame, message: &str) {
    let full = frame.area();
    let width = (message.chars().count() as u16 + 4).min(full.width);
    let x = full.x + (full.width.saturating_sub(width)) / 2;
    let y = full.y + full.height.saturating_sub(4);
    let area = Rect::new(x, y, width, 3.min(full.height));

    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(Line::from(format!(" {} ", message)))
        .style(styles::toast_style())
        .block(Block::default().borders(Borders::ALL).border_style(styles::toast_style()));
    frame.render_widget(paragraph, area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(48, 18, frame.area());

    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");
    let key = |k: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", k), styles::help_key_style()),
            Span::styled(desc, styles::help_desc_style()),
        ])
    };

    let help_text = vec![
        Line::from(Span::styled(format!(" {} {}", APP_TITLE, version), styles::title_style())),
        Line::from(""),
        key("↑/↓ j/k", "Move selection"),
        key("PgUp/PgDn", "Page up/down"),
        key("Home/End", "First/last row"),
        key("Enter", "Collapse or expand group"),
        key("←/→ Tab", "Previous/next filter"),
        key("1-9", "Pick filter"),
        key("/", "Search"),
        key("Esc", "Clear search"),
        key("r", "Reload dataset"),
        key("?", "Toggle help"),
        key("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled("  Press any key to close", styles::muted_style())),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
