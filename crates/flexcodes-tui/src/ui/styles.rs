use ratatui::style::{Color, Modifier, Style};

// Color palette
pub const PRIMARY: Color = Color::Rgb(10, 132, 255);
pub const ACCENT: Color = Color::Rgb(255, 159, 10);
pub const ERROR: Color = Color::Rgb(255, 69, 58);
pub const MUTED: Color = Color::Rgb(142, 142, 147);
pub const HIGHLIGHT: Color = Color::Rgb(44, 44, 52);
const BAR: Color = Color::Rgb(28, 28, 34);

pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

/// Title bar once the list has scrolled
pub fn compact_title_style() -> Style {
    Style::default().fg(Color::White).bg(BAR)
}

pub fn selected_style() -> Style {
    Style::default().bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn group_header_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn highlight_style() -> Style {
    Style::default().fg(ACCENT)
}

pub fn error_style() -> Style {
    Style::default().fg(ERROR)
}

pub fn chip_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(Color::Black)
            .bg(PRIMARY)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(PRIMARY)
    } else {
        Style::default().fg(MUTED)
    }
}

pub fn search_style() -> Style {
    Style::default().fg(ACCENT)
}

pub fn status_bar_style() -> Style {
    Style::default().bg(BAR).fg(Color::White)
}

pub fn toast_style() -> Style {
    Style::default()
        .fg(Color::White)
        .bg(Color::Rgb(58, 58, 60))
        .add_modifier(Modifier::BOLD)
}

pub fn help_key_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    Style::default().fg(Color::White)
}
