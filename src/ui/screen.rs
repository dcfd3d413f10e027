use ratatui::{layout::Rect, Frame};

use crate::{
    ui::{dashboard::render_dashboard, leaderboard::render_leaderboard},
    App, AppState,
};

/// A UI Screen boundary: renders the body between header and footer
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect);
}

/// Live run panel, weekly cards and route map
pub struct DashboardScreen;

impl Screen for DashboardScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        render_dashboard(app, f, area);
    }
}

/// Weekly league table
pub struct LeaderboardScreen;

impl Screen for LeaderboardScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        render_leaderboard(app, f, area);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Dashboard => Box::new(DashboardScreen),
        AppState::Leaderboard => Box::new(LeaderboardScreen),
    }
}
