//! Colors and styles for the quiz screens.

use ratatui::style::{Color, Modifier, Style};

/// Panel headings.
const HEADING: Color = Color::Rgb(64, 128, 192);
/// Checkpoints the last fix is inside of.
pub const UNLOCKED: Color = Color::Rgb(96, 160, 96);
/// Checkpoints still out of range.
pub const RADIUS: Color = Color::Rgb(15, 118, 110);
/// Anything that needs a tap or answers the quiz.
const PROMPT: Color = Color::Rgb(214, 150, 40);
/// The user's own position on the map.
const YOU: Color = Color::Rgb(230, 90, 160);
const ERROR: Color = Color::Rgb(192, 64, 64);
const HINT: Color = Color::Rgb(128, 128, 128);

pub fn heading_style() -> Style {
    Style::default().fg(HEADING).add_modifier(Modifier::BOLD)
}

pub fn place_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn selected_place_style() -> Style {
    Style::default()
        .bg(Color::Rgb(48, 48, 64))
        .add_modifier(Modifier::BOLD)
}

pub fn unlocked_style() -> Style {
    Style::default().fg(UNLOCKED).add_modifier(Modifier::BOLD)
}

pub fn hint_style() -> Style {
    Style::default().fg(HINT)
}

pub fn prompt_style() -> Style {
    Style::default().fg(PROMPT)
}

pub fn answer_style() -> Style {
    Style::default().fg(PROMPT).add_modifier(Modifier::ITALIC)
}

pub fn you_marker_style() -> Style {
    Style::default().fg(YOU).add_modifier(Modifier::BOLD)
}

pub fn error_style() -> Style {
    Style::default().fg(ERROR)
}

pub fn panel_border_style() -> Style {
    Style::default().fg(HINT)
}

/// The map border lights up while a tap is awaited.
pub fn map_border_style(tap_armed: bool) -> Style {
    if tap_armed {
        Style::default().fg(PROMPT).add_modifier(Modifier::BOLD)
    } else {
        panel_border_style()
    }
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::Rgb(32, 32, 40)).fg(Color::White)
}

pub fn help_key_style() -> Style {
    prompt_style().add_modifier(Modifier::BOLD)
}
