//! Key bindings: normal and vim-style.

use crate::token::Direction;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move the board cursor (or the menu selection).
    Cursor(Direction),
    /// Swap the token under the cursor with its neighbour.
    Swipe(Direction),
    /// Select / swap / fire at the cursor; confirm in menus.
    Tap,
    PowerUp,
    /// Cancel targeting or selection.
    Back,
    Hint,
    Pause,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl, etc.).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let shift = modifiers == KeyModifiers::SHIFT;
    let no_mod = modifiers.is_empty() || shift;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Left if shift => Action::Swipe(Direction::Left),
        KeyCode::Right if shift => Action::Swipe(Direction::Right),
        KeyCode::Up if shift => Action::Swipe(Direction::Up),
        KeyCode::Down if shift => Action::Swipe(Direction::Down),
        KeyCode::Char('H') => Action::Swipe(Direction::Left),
        KeyCode::Char('L') => Action::Swipe(Direction::Right),
        KeyCode::Char('K') => Action::Swipe(Direction::Up),
        KeyCode::Char('J') => Action::Swipe(Direction::Down),
        KeyCode::Left | KeyCode::Char('h') => Action::Cursor(Direction::Left),
        KeyCode::Right | KeyCode::Char('l') => Action::Cursor(Direction::Right),
        KeyCode::Up | KeyCode::Char('k') => Action::Cursor(Direction::Up),
        KeyCode::Down | KeyCode::Char('j') => Action::Cursor(Direction::Down),
        KeyCode::Enter | KeyCode::Char(' ') => Action::Tap,
        KeyCode::Char('e' | 'E') => Action::PowerUp,
        KeyCode::Esc => Action::Back,
        KeyCode::Char('?') => Action::Hint,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('q' | 'Q') => Action::Quit,
        _ => Action::None,
    }
}
