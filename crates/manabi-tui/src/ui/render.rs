use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use manabi_core::proximity::NO_CHECKPOINT_HINT;
use manabi_core::QuizView;

use crate::app::{App, AppState};

use super::map::render_map;
use super::styles;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Manabi walking quiz";
    let mode = format!("[t] Mode: {}", app.session.mode().label());
    let help_hint = "[?] Help";

    let title_line = Line::from(vec![
        Span::styled(title, styles::heading_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub((title.len() + mode.len() + help_hint.len() + 4) as u16)
                as usize,
        )),
        Span::styled(mode, styles::prompt_style()),
        Span::raw("  "),
        Span::styled(help_hint, styles::hint_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::panel_border_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_map(frame, app, columns[0]);

    let place_rows = app.session.checkpoints().len().max(1) as u16 + 2;
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Max(place_rows.min(columns[1].height / 2)),
            Constraint::Min(5),
        ])
        .split(columns[1]);

    render_place_list(frame, app, side[0]);
    render_quiz_box(frame, app, side[1]);
}

fn render_place_list(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Checkpoints ", styles::heading_style()))
        .borders(Borders::ALL)
        .border_style(styles::panel_border_style());

    let checkpoints = app.session.checkpoints();
    if checkpoints.is_empty() {
        let text = if app.session.quiz_enabled() {
            "No checkpoints."
        } else {
            "Checkpoints could not be loaded."
        };
        let paragraph = Paragraph::new(Span::styled(text, styles::hint_style())).block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = checkpoints
        .iter()
        .map(|cp| {
            ListItem::new(Line::from(vec![
                Span::styled(cp.name.clone(), styles::place_style()),
                Span::raw(" "),
                Span::styled(format!("[{}]", cp.radius_label()), styles::hint_style()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(styles::selected_place_style());
    let mut state = ListState::default().with_selected(Some(app.place_selection));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_quiz_box(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Quiz ", styles::heading_style()))
        .borders(Borders::ALL)
        .border_style(styles::panel_border_style());

    let lines = quiz_lines(app);
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn quiz_lines(app: &App) -> Vec<Line<'static>> {
    if let Some(err) = app.session.load_error() {
        return vec![Line::from(Span::styled(err.user_message(), styles::error_style()))];
    }

    match app.session.view() {
        None => vec![Line::from(Span::styled(
            "Press [l] to check your location.",
            styles::hint_style(),
        ))],
        Some(QuizView::NothingNearby) => vec![Line::from(Span::styled(
            NO_CHECKPOINT_HINT,
            styles::hint_style(),
        ))],
        Some(QuizView::Unlocked(inside)) => {
            let mut lines = Vec::new();
            for hit in inside {
                let cp = hit.checkpoint;
                lines.push(Line::from(vec![
                    Span::styled(cp.name.clone(), styles::unlocked_style()),
                    Span::styled(format!("  {} away", hit.distance_display()), styles::hint_style()),
                ]));
                lines.push(Line::from(cp.quiz.clone()));
                if app.reveal_answers {
                    lines.push(Line::from(Span::styled(
                        format!("Answer: {}", cp.answer),
                        styles::answer_style(),
                    )));
                } else {
                    lines.push(Line::from(Span::styled(
                        "[a] Show answer",
                        styles::hint_style(),
                    )));
                }
                lines.push(Line::from(""));
            }
            lines
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (message, style) = match &app.status_message {
        Some(msg) if app.status_is_error => (msg.clone(), styles::error_style()),
        Some(msg) => (msg.clone(), styles::status_bar_style()),
        None => (
            "[l] Locate  [t] Toggle tap mode  [q] Quit".to_string(),
            styles::hint_style(),
        ),
    };

    let mut spans = vec![Span::raw(" "), Span::styled(message, style)];
    if app.is_locating() {
        spans.push(Span::styled("  (locating)", styles::prompt_style()));
    }
    spans.push(Span::raw("  "));
    spans.push(Span::styled(app.cache_status.label(), styles::hint_style()));

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(styles::panel_border_style());
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_help_overlay(frame: &mut Frame) {
    let keys = [
        ("l", "Get location (GPS or next map tap)"),
        ("t", "Toggle tap mode"),
        ("click", "Use map point as location (tap mode)"),
        ("a", "Show / hide answers"),
        ("Up/Down", "Select checkpoint"),
        ("Enter", "Show checkpoint on map"),
        ("c", "Center on last location"),
        ("+ / -", "Zoom in / out"),
        ("q", "Quit"),
    ];

    let lines: Vec<Line> = keys
        .iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::styled(format!("{:>8}  ", key), styles::help_key_style()),
                Span::styled(*desc, styles::place_style()),
            ])
        })
        .collect();

    let area = centered_rect(50, (keys.len() + 2) as u16, frame.area());
    let block = Block::default()
        .title(Span::styled(" Help ", styles::heading_style()))
        .borders(Borders::ALL);

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
