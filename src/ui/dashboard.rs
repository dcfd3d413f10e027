use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Block, Borders, Paragraph,
    },
    Frame,
};
use strides::{
    geo::GeoPoint,
    leaderboard::LeaderboardCategory,
    profile::UserProfile,
    session::{RunSnapshot, RunStatus, RunSummary},
    util::{format_duration, format_pace},
};

use crate::{ui::map, App};

/// Title and value for one of the weekly cards
pub fn weekly_cards(profile: Option<&UserProfile>, league_rank: usize) -> [(&'static str, String); 4] {
    let stats = profile.map(|p| p.weekly_stats).unwrap_or_default();
    [
        (
            "Longest Run",
            LeaderboardCategory::Distance.format_value(stats.distance_km),
        ),
        (
            "Top Speed",
            LeaderboardCategory::AvgSpeed.format_value(stats.avg_speed_kmh),
        ),
        ("Best Pace", format_pace(stats.pace_min_per_km)),
        ("League Rank", format!("#{league_rank}")),
    ]
}

/// Label and color for the run status badge
pub fn status_badge(status: RunStatus) -> (&'static str, Color) {
    match status {
        RunStatus::Idle => ("READY", Color::Gray),
        RunStatus::Tracking => ("TRACKING", Color::Green),
        RunStatus::Paused => ("PAUSED", Color::Yellow),
    }
}

/// Rows of the live panel
pub fn live_rows(snapshot: &RunSnapshot) -> [(&'static str, String); 3] {
    [
        ("Distance", format!("{:.2} km", snapshot.total_distance_km)),
        ("Speed", format!("{:.1} km/h", snapshot.current_speed_kmh)),
        ("Duration", format_duration(snapshot.elapsed_seconds)),
    ]
}

/// One-line recap of the last finished run
pub fn last_run_line(summary: &RunSummary) -> String {
    format!(
        "Last run: {:.2} km in {} at {:.1} km/h ({})",
        summary.distance_km,
        format_duration(summary.duration_seconds),
        summary.avg_speed_kmh,
        format_pace(summary.pace_min_per_km()),
    )
}

pub fn render_dashboard(app: &App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Weekly cards
            Constraint::Min(8),    // Live panel and map
            Constraint::Length(1), // Last run
        ])
        .split(area);

    render_cards(app, f, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(chunks[1]);

    render_live_panel(&app.live, f, body[0]);

    let route: &[GeoPoint] = if app.live.route.is_empty() {
        &app.last_route
    } else {
        &app.live.route
    };
    render_route(route, app.anchor, f, body[1]);

    if let Some(summary) = &app.last_run {
        f.render_widget(
            Paragraph::new(last_run_line(summary))
                .style(Style::default().add_modifier(Modifier::DIM)),
            chunks[2],
        );
    }
}

fn render_cards(app: &App, f: &mut Frame, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    let cards = weekly_cards(app.profile(), app.league_rank());
    for ((title, value), column) in cards.iter().zip(columns.iter()) {
        let card = Paragraph::new(Span::styled(
            value.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(*title));
        f.render_widget(card, *column);
    }
}

fn render_live_panel(snapshot: &RunSnapshot, f: &mut Frame, area: Rect) {
    let (badge, color) = status_badge(snapshot.status);

    let mut lines = vec![
        Line::from(Span::styled(
            badge,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    for (label, value) in live_rows(snapshot) {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{label:<10}"),
                Style::default().add_modifier(Modifier::DIM),
            ),
            Span::styled(value, Style::default().add_modifier(Modifier::BOLD)),
        ]));
    }

    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Run")),
        area,
    );
}

fn render_route(route: &[GeoPoint], anchor: Option<GeoPoint>, f: &mut Frame, area: Rect) {
    let (x_bounds, y_bounds) = map::route_bounds(route, anchor);
    let here = route.last().copied().or(anchor);
    let title = match here {
        Some(p) => format!("Route · {}", map::format_coord(p)),
        None => "Route".to_string(),
    };

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            for pair in route.windows(2) {
                ctx.draw(&CanvasLine::new(
                    pair[0].longitude,
                    pair[0].latitude,
                    pair[1].longitude,
                    pair[1].latitude,
                    Color::Cyan,
                ));
            }
            if let Some(p) = here {
                ctx.print(
                    p.longitude,
                    p.latitude,
                    Span::styled("●", Style::default().fg(Color::Yellow)),
                );
            }
        });
    f.render_widget(canvas, area);
}
