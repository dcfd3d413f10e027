use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs},
    Frame,
};
use strides::{
    leaderboard::{rank, LeaderboardCategory},
    profile::{UserId, UserProfile},
    util::initials,
};

use crate::App;

const CROWN: &str = "♛";

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub crown: bool,
    pub avatar: String,
    pub name: String,
    pub value: String,
    pub is_me: bool,
}

/// Build display rows for `category`, flagging the podium and the current user
pub fn leaderboard_rows(
    users: &[UserProfile],
    me: UserId,
    category: LeaderboardCategory,
) -> Vec<LeaderboardRow> {
    rank(users, category)
        .into_iter()
        .map(|entry| LeaderboardRow {
            rank: entry.rank,
            crown: entry.is_podium(),
            avatar: initials(&entry.user.name),
            value: category.format_value(entry.value),
            is_me: entry.user.id == me,
            name: entry.user.name,
        })
        .collect()
}

pub fn render_leaderboard(app: &App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let selected = LeaderboardCategory::ALL
        .iter()
        .position(|c| *c == app.category)
        .unwrap_or(0);
    let titles: Vec<String> = LeaderboardCategory::ALL
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} {}", i + 1, c))
        .collect();
    let tabs = Tabs::new(titles)
        .select(selected)
        .block(Block::default().borders(Borders::ALL).title("This week"))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, chunks[0]);

    let rows = leaderboard_rows(&app.users, app.user.user_id, app.category);
    if rows.is_empty() {
        f.render_widget(
            Paragraph::new("No runners yet.").block(Block::default().borders(Borders::ALL)),
            chunks[1],
        );
        return;
    }

    let table_rows = rows.iter().map(|row| {
        let style = if row.is_me {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else if row.crown {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(format!("{:>2}", row.rank)),
            Cell::from(if row.crown { CROWN } else { "" }),
            Cell::from(row.avatar.clone()),
            Cell::from(row.name.clone()),
            Cell::from(row.value.clone()),
        ])
        .style(style)
    });

    let value_header = app.category.to_string();
    let table = Table::new(
        table_rows,
        [
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(14),
        ],
    )
    .header(
        Row::new(vec!["#", "", "", "Runner", value_header.as_str()])
            .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)),
    )
    .block(Block::default().borders(Borders::ALL).title("Leaderboard"));

    f.render_widget(table, chunks[1]);
}
