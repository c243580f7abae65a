//! Keyboard input handling for the TUI.
//!
//! Translates key events into `App` state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{App, AppState, PAGE_SCROLL_SIZE};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::ShowingHelp => {
            app.state = AppState::Normal;
            Ok(false)
        }
        AppState::Searching => {
            handle_search_input(app, key);
            Ok(false)
        }
        AppState::Quitting => Ok(true),
        AppState::Normal => handle_normal_input(app, key),
    }
}

fn handle_search_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.clear_query();
            app.state = AppState::Normal;
        }
        KeyCode::Enter | KeyCode::Down => {
            app.state = AppState::Normal;
        }
        KeyCode::Backspace => app.pop_query_char(),
        KeyCode::Char(c) => app.push_query_char(c),
        _ => {}
    }
}

fn handle_normal_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('/') => app.state = AppState::Searching,
        KeyCode::Esc => {
            if !app.search_query.is_empty() {
                app.clear_query();
            }
        }
        KeyCode::Char('r') => app.start_load(),

        // Filter chips
        KeyCode::Left | KeyCode::BackTab => app.cycle_filter(false),
        KeyCode::Right | KeyCode::Tab => app.cycle_filter(true),
        KeyCode::Char(c @ '1'..='9') => {
            if let Some(index) = c.to_digit(10) {
                app.set_filter(index as usize - 1);
            }
        }

        // Navigation
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::PageUp => app.move_selection(-(PAGE_SCROLL_SIZE as isize)),
        KeyCode::PageDown => app.move_selection(PAGE_SCROLL_SIZE as isize),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selected_group(),
        _ => {}
    }
    Ok(false)
}
