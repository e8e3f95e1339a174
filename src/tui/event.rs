use crossterm::event::{KeyCode, KeyEvent};

use super::app::App;

/// Result of handling a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Refresh,
    Toggle(i64),
    Delete(i64),
    Continue,
}

/// Handle a key press. Returns an action indicating what the event loop should do.
pub fn handle_key(app: &mut App, key: KeyEvent) -> KeyAction {
    if let Some(id) = app.pending_delete {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                app.pending_delete = None;
                KeyAction::Delete(id)
            }
            _ => {
                app.cancel_delete();
                KeyAction::Continue
            }
        };
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('j') | KeyCode::Down => {
            app.move_down();
            KeyAction::Continue
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.move_up();
            KeyAction::Continue
        }
        KeyCode::Char(' ') => match app.selected_id() {
            Some(id) => KeyAction::Toggle(id),
            None => KeyAction::Continue,
        },
        KeyCode::Char('d') => {
            app.request_delete();
            KeyAction::Continue
        }
        KeyCode::Char('r') => KeyAction::Refresh,
        _ => KeyAction::Continue,
    }
}
