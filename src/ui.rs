pub mod dashboard;
pub mod leaderboard;
pub mod map;
pub mod screen;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};
use strides::session::RunStatus;

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 2;

pub fn ui(app: &mut App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Screen
            Constraint::Length(2), // Status and key hints
        ])
        .split(f.area());

    render_header(app, f, chunks[0]);
    screen::current_screen(&app.state).render(app, f, chunks[1]);
    render_footer(app, f, chunks[2]);
}

fn render_header(app: &App, f: &mut Frame, area: Rect) {
    let selected = match app.state {
        AppState::Dashboard => 0,
        AppState::Leaderboard => 1,
    };
    let tabs = Tabs::new(vec!["Dashboard", "Leaderboard"])
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" strides · {} ", app.user.display_name)),
        )
        .style(Style::default().add_modifier(Modifier::DIM))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

fn render_footer(app: &App, f: &mut Frame, area: Rect) {
    let status = match &app.status {
        Some(line) if line.is_error => Line::from(Span::styled(
            line.text.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Some(line) => Line::from(Span::styled(
            line.text.clone(),
            Style::default().fg(Color::Green),
        )),
        None => Line::default(),
    };

    let hints = Line::from(Span::styled(
        key_hints(app),
        Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
    ));

    f.render_widget(
        Paragraph::new(vec![status, hints]).alignment(Alignment::Left),
        area,
    );
}

/// Key hints for the current screen and run status
pub fn key_hints(app: &App) -> String {
    let mut hints: Vec<&str> = Vec::new();
    match app.state {
        AppState::Dashboard => {
            match app.live.status {
                RunStatus::Idle => hints.push("(s)tart"),
                RunStatus::Tracking => hints.extend(["(p)ause", "(x) stop"]),
                RunStatus::Paused => hints.extend(["(s) resume", "(x) stop"]),
            }
            hints.push("(l)eaderboard");
        }
        AppState::Leaderboard => {
            hints.extend(["(1-3/←→) category", "(d)ashboard"]);
        }
    }
    if app.pending.is_some() {
        hints.push("(u) retry upload");
    }
    hints.push("(q)uit");
    hints.join(" / ")
}
