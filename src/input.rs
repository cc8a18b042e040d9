//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] mutations and, when the user asks
//! for a search, to a [`Command`] for the aggregator.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a `KeyCode` match arm below that calls it.
//! 3. Update the help text in [`crate::ui`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::aggregator::Command;
use crate::app::App;

/// Process a single key event.  Returns a command to forward to the
/// aggregator, if the key asked for one.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if app.editing {
        return handle_form_key(app, key);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('/') => app.editing = true,
        KeyCode::Char('s') => return Some(Command::Search(app.submit())),
        _ => {}
    }
    None
}

fn handle_form_key(app: &mut App, key: KeyEvent) -> Option<Command> {
    match key.code {
        KeyCode::Esc => app.editing = false,
        KeyCode::Enter => return Some(Command::Search(app.submit())),
        KeyCode::Tab => app.form.focus_next(),
        KeyCode::BackTab => app.form.focus_previous(),
        KeyCode::Backspace => app.form.pop_char(),
        KeyCode::Char(c) => app.form.push_char(c),
        _ => {}
    }
    None
}
