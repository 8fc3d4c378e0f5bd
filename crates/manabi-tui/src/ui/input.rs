//! Keyboard and mouse handling for the TUI.

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, AppState};

/// Handle a key press. Returns true when the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> bool {
    if matches!(app.state, AppState::ShowingHelp) {
        // Any key closes help
        app.state = AppState::Normal;
        return false;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.state = AppState::Quitting;
            return true;
        }
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('l') => app.start_locate(),
        KeyCode::Char('t') => app.toggle_mode(),
        KeyCode::Char('a') => app.reveal_answers = !app.reveal_answers,
        KeyCode::Char('c') => app.recenter(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.viewport.zoom_in(),
        KeyCode::Char('-') => app.viewport.zoom_out(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next_place(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev_place(),
        KeyCode::Enter => app.show_selected_place(),
        _ => {}
    }
    false
}

/// Handle a mouse event. Left clicks on the map feed tap mode.
pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
        app.map_clicked(mouse.column, mouse.row);
    }
}
