pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use log::{error, info, warn};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::mpsc::Receiver,
    time::Duration,
};
use strides::{
    app_dirs::AppDirs,
    cadence::{Cadence, ThreadCadence},
    config::{Config, ConfigStore, FileConfigStore, SourceKind},
    error::ProfileError,
    geo::GeoPoint,
    leaderboard::{rank_of, LeaderboardCategory},
    profile::{submit_run, ProfileStore, SqliteProfileStore, UserContext, UserId, UserProfile},
    runtime::{AppEvent, AppEventSource, CrosstermEventSource, FixedTicker, Runner, Ticker},
    sensor::{PositionSource, RunEvent},
    session::{CompletedRun, RunSession, RunSnapshot, RunStatus, RunSummary},
    sources::{self, bundled_track_names},
};

use crate::ui::ui;

const TICK_RATE_MS: u64 = 250;

/// terminal run tracker with live distance, speed and a weekly leaderboard
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Track runs from a position source, watch distance, speed and duration live, and compare your week against everyone else on the leaderboard."
)]
pub struct Cli {
    /// display name for a newly registered profile
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// record runs as this existing user id
    #[clap(short = 'u', long)]
    user: Option<i64>,

    /// where position fixes come from
    #[clap(short = 's', long, value_enum)]
    source: Option<SourceKind>,

    /// bundled track name or CSV path to replay (implies --source replay)
    #[clap(short = 't', long)]
    track: Option<String>,

    /// replay speed multiplier
    #[clap(short = 'r', long)]
    rate: Option<f64>,

    /// profile database path
    #[clap(long)]
    db: Option<PathBuf>,

    /// print the bundled replay tracks and exit
    #[clap(long)]
    list_tracks: bool,
}

impl Cli {
    /// Layer command line overrides on top of the stored config
    fn apply(&self, cfg: &mut Config) {
        if let Some(name) = &self.name {
            cfg.display_name = name.clone();
        }
        if let Some(id) = self.user {
            cfg.user_id = Some(id);
        }
        if let Some(track) = &self.track {
            cfg.replay_track = Some(track.clone());
            cfg.source = SourceKind::Replay;
        }
        if let Some(source) = self.source {
            cfg.source = source;
        }
        if let Some(rate) = self.rate {
            cfg.playback_rate = rate;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Dashboard,
    Leaderboard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
}

pub type TrackedSession = RunSession<Box<dyn PositionSource>, Box<dyn Cadence>>;

pub struct App {
    pub session: TrackedSession,
    pub store: Box<dyn ProfileStore>,
    pub user: UserContext,
    pub state: AppState,
    pub category: LeaderboardCategory,
    /// Latest snapshot pushed by the session
    pub live: RunSnapshot,
    snapshots: Receiver<RunSnapshot>,
    pub users: Vec<UserProfile>,
    pub last_run: Option<RunSummary>,
    pub last_route: Vec<GeoPoint>,
    /// Finished run whose upload failed
    pub pending: Option<CompletedRun>,
    pub status: Option<StatusLine>,
    /// Position before any run, used to center the map
    pub anchor: Option<GeoPoint>,
}

impl App {
    pub fn new(mut session: TrackedSession, store: Box<dyn ProfileStore>, user: UserContext) -> Self {
        let anchor = match session.locate() {
            Ok(fix) => Some(fix.point),
            Err(e) => {
                info!("no initial position: {e}");
                None
            }
        };
        let snapshots = session.subscribe_snapshots();

        let mut app = Self {
            session,
            store,
            user,
            state: AppState::Dashboard,
            category: LeaderboardCategory::default(),
            live: RunSnapshot::default(),
            snapshots,
            users: Vec::new(),
            last_run: None,
            last_route: Vec::new(),
            pending: None,
            status: None,
            anchor,
        };
        app.refresh_users();
        app.sync();
        app
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.users.iter().find(|u| u.id == self.user.user_id)
    }

    /// Rank by weekly distance, shown on the dashboard
    pub fn league_rank(&self) -> usize {
        rank_of(&self.users, self.user.user_id, LeaderboardCategory::Distance)
    }

    pub fn refresh_users(&mut self) {
        match self.store.users() {
            Ok(users) => self.users = users,
            Err(e) => {
                warn!("could not load profiles: {e}");
                self.set_error(format!("Could not load profiles: {e}"));
            }
        }
    }

    pub fn start_or_resume(&mut self) {
        let result = match self.session.status() {
            RunStatus::Idle => self.session.start(),
            RunStatus::Paused => self.session.resume(),
            RunStatus::Tracking => Ok(()),
        };
        match result {
            Ok(()) => self.status = None,
            Err(e) => {
                warn!("could not start tracking: {e}");
                self.set_error(e.user_message());
            }
        }
        self.sync();
    }

    pub fn pause(&mut self) {
        self.session.pause();
        self.sync();
    }

    pub fn stop(&mut self) {
        if let Some(run) = self.session.stop(&self.user) {
            self.last_run = Some(run.summary);
            self.last_route = run.route.clone();
            self.submit(run);
        }
        self.sync();
    }

    pub fn retry_upload(&mut self) {
        if let Some(run) = self.pending.take() {
            self.submit(run);
        }
    }

    pub fn on_run_event(&mut self, event: RunEvent) {
        let ended = matches!(event, RunEvent::SourceEnded { .. });
        let was_tracking = self.session.status() == RunStatus::Tracking;
        match self.session.handle_event(event) {
            Err(e) => {
                error!("tracking stopped: {e}");
                self.set_error(e.user_message());
            }
            Ok(()) if ended && was_tracking && self.session.status() == RunStatus::Paused => {
                self.set_info("Position source finished. Press x to save the run.".to_string());
            }
            Ok(()) => {}
        }
        self.sync();
    }

    /// Returns false when the app should quit
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return true;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return false;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return false,
            KeyCode::Char('s') => self.start_or_resume(),
            KeyCode::Char('p') => self.pause(),
            KeyCode::Char('x') => self.stop(),
            KeyCode::Char('u') => self.retry_upload(),
            KeyCode::Char('l') => {
                self.refresh_users();
                self.state = AppState::Leaderboard;
            }
            KeyCode::Char('d') => self.state = AppState::Dashboard,
            KeyCode::Char(c @ '1'..='3') if self.state == AppState::Leaderboard => {
                let index = c as usize - '1' as usize;
                self.category = LeaderboardCategory::ALL[index];
            }
            KeyCode::Right if self.state == AppState::Leaderboard => {
                self.category = self.category.next();
            }
            KeyCode::Left if self.state == AppState::Leaderboard => {
                self.category = self.category.previous();
            }
            _ => {}
        }
        true
    }

    fn submit(&mut self, run: CompletedRun) {
        let distance = run.summary.distance_km;
        match submit_run(self.store.as_mut(), run) {
            Ok(stats) => {
                self.pending = None;
                self.set_info(format!(
                    "Run saved: {distance:.2} km. Week best {:.2} km.",
                    stats.distance_km
                ));
                self.refresh_users();
            }
            Err(err) => {
                warn!("{err}");
                self.set_error(format!("{err}. Press u to retry."));
                self.pending = Some(*err.run);
            }
        }
    }

    /// Pull every snapshot the session pushed since the last call
    fn sync(&mut self) {
        for snapshot in self.snapshots.try_iter() {
            self.live = snapshot;
        }
    }

    fn set_error(&mut self, text: String) {
        self.status = Some(StatusLine {
            text,
            is_error: true,
        });
    }

    fn set_info(&mut self, text: String) {
        self.status = Some(StatusLine {
            text,
            is_error: false,
        });
    }
}

/// Send log output to a file in the state dir so it never draws over the TUI
fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .target(env_logger::Target::Pipe(Box::new(file)))
            .try_init();
    }
}

/// Find the configured profile, registering a new one when it is missing
fn resolve_user(store: &mut dyn ProfileStore, cfg: &mut Config) -> Result<UserContext, ProfileError> {
    if let Some(id) = cfg.user_id {
        if let Some(profile) = store.user(UserId(id))? {
            return Ok(profile.context());
        }
        warn!("user {id} not found, registering a new profile");
    }
    let profile = store.register(&cfg.display_name)?;
    cfg.user_id = Some(profile.id.0);
    Ok(profile.context())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.list_tracks {
        for name in bundled_track_names() {
            println!("{name}");
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let config_store = FileConfigStore::new();
    let mut cfg = config_store.load();
    cli.apply(&mut cfg);

    let mut store = match &cli.db {
        Some(path) => SqliteProfileStore::open(path)?,
        None => SqliteProfileStore::open_default()?,
    };
    let user = resolve_user(&mut store, &mut cfg)?;

    // Only the identity is persisted; the other flags are per invocation.
    let mut persisted = config_store.load();
    if persisted.user_id != cfg.user_id {
        persisted.user_id = cfg.user_id;
        persisted.display_name = user.display_name.clone();
        if let Err(e) = config_store.save(&persisted) {
            warn!("could not save config to {}: {e}", config_store.path().display());
        }
    }

    let source = sources::from_config(&cfg)?;
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let cadence: Box<dyn Cadence> = Box::new(ThreadCadence::default());
    let session = RunSession::new(source, cadence, runner.run_sink()).with_options(cfg.fix_options());
    let mut app = App::new(session, Box::new(store), user);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: AppEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            AppEvent::Tick | AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if !app.on_key(key) {
                    break;
                }
            }
            AppEvent::Run(event) => app.on_run_event(event),
        }
        terminal.draw(|f| ui(app, f))?;
    }

    // Quitting mid-run keeps what was recorded.
    if app.session.status() != RunStatus::Idle {
        app.stop();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::mpsc;
    use std::sync::Arc;
    use strides::{
        cadence::ManualCadence,
        error::{SensorError, TrackerError},
        profile::{RunRecord, WeeklyStats},
        sensor::{ScriptedSource, SharedSink},
    };

    struct Harness {
        app: App,
        source: ScriptedSource,
        cadence: ManualCadence,
        events: mpsc::Receiver<RunEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let mut store = SqliteProfileStore::open_in_memory().unwrap();
            let me = store_with_league(&mut store);
            Self::with_store(me, store)
        }

        fn with_store<S: ProfileStore + 'static>(me: UserProfile, store: S) -> Self {
            let source = ScriptedSource::new();
            let cadence = ManualCadence::new();
            let (tx, events) = mpsc::channel::<RunEvent>();
            let sink: SharedSink = Arc::new(tx);
            let session: TrackedSession = RunSession::new(
                Box::new(source.clone()) as Box<dyn PositionSource>,
                Box::new(cadence.clone()) as Box<dyn Cadence>,
                sink,
            );
            let app = App::new(session, Box::new(store), me.context());
            Self {
                app,
                source,
                cadence,
                events,
            }
        }

        fn key(&mut self, code: KeyCode) -> bool {
            self.app.on_key(KeyEvent::new(code, KeyModifiers::NONE))
        }

        fn dispatch(&mut self) {
            let pending: Vec<RunEvent> = self.events.try_iter().collect();
            for event in pending {
                self.app.on_run_event(event);
            }
        }

        fn fix(&mut self, lat: f64, lon: f64, speed: Option<f64>) {
            self.source.push_fix(lat, lon, speed);
            self.dispatch();
        }

        fn tick(&mut self, secs: u64) {
            self.cadence.advance(secs);
            self.dispatch();
        }

        fn screen(&mut self) -> String {
            let mut terminal = Terminal::new(TestBackend::new(110, 30)).unwrap();
            terminal.draw(|f| ui(&mut self.app, f)).unwrap();
            terminal
                .backend()
                .buffer()
                .content
                .iter()
                .map(|c| c.symbol())
                .collect()
        }
    }

    /// Registers the test user plus two rivals and returns the test user.
    fn store_with_league(store: &mut SqliteProfileStore) -> UserProfile {
        let me = store.register("Test Runner").unwrap();
        store.register("Sarah").unwrap();
        store.register("Mike").unwrap();
        me
    }

    /// Store that fails every write while `failing` is set
    struct FlakyStore {
        inner: SqliteProfileStore,
        failing: Rc<Cell<bool>>,
    }

    impl ProfileStore for FlakyStore {
        fn register(&mut self, name: &str) -> Result<UserProfile, ProfileError> {
            self.inner.register(name)
        }

        fn user(&self, id: UserId) -> Result<Option<UserProfile>, ProfileError> {
            self.inner.user(id)
        }

        fn users(&self) -> Result<Vec<UserProfile>, ProfileError> {
            self.inner.users()
        }

        fn record_run(&mut self, run: &CompletedRun) -> Result<WeeklyStats, ProfileError> {
            if self.failing.get() {
                return Err(ProfileError::Io(io::Error::other("disk full")));
            }
            self.inner.record_run(run)
        }

        fn history(&self, id: UserId, limit: usize) -> Result<Vec<RunRecord>, ProfileError> {
            self.inner.history(id, limit)
        }
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["strides"]);
        let mut cfg = Config::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg, Config::default());
        assert!(!cli.list_tracks);
        assert!(cli.db.is_none());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "strides", "--name", "Jess", "--user", "4", "--source", "none", "--rate", "5",
        ]);
        let mut cfg = Config::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.display_name, "Jess");
        assert_eq!(cfg.user_id, Some(4));
        assert_eq!(cfg.source, SourceKind::Disabled);
        assert_eq!(cfg.playback_rate, 5.0);
    }

    #[test]
    fn test_cli_track_implies_replay() {
        let cli = Cli::parse_from(["strides", "-t", "riverside"]);
        let mut cfg = Config::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.source, SourceKind::Replay);
        assert_eq!(cfg.replay_track.as_deref(), Some("riverside"));
    }

    #[test]
    fn test_cli_rejects_unknown_source() {
        assert!(Cli::try_parse_from(["strides", "--source", "gps"]).is_err());
    }

    #[test]
    fn test_resolve_user_registers_once() {
        let mut store = SqliteProfileStore::open_in_memory().unwrap();
        let mut cfg = Config {
            display_name: "Newbie".into(),
            ..Config::default()
        };

        let first = resolve_user(&mut store, &mut cfg).unwrap();
        assert_eq!(first.display_name, "Newbie");
        assert_eq!(cfg.user_id, Some(first.user_id.0));

        let second = resolve_user(&mut store, &mut cfg).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.users().unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_user_replaces_missing_profile() {
        let mut store = SqliteProfileStore::open_in_memory().unwrap();
        let mut cfg = Config {
            user_id: Some(41),
            ..Config::default()
        };
        let user = resolve_user(&mut store, &mut cfg).unwrap();
        assert_ne!(user.user_id, UserId(41));
        assert_eq!(cfg.user_id, Some(user.user_id.0));
    }

    #[test]
    fn test_new_app_starts_idle_on_dashboard() {
        let h = Harness::new();
        assert_eq!(h.app.state, AppState::Dashboard);
        assert_eq!(h.app.live.status, RunStatus::Idle);
        assert_eq!(h.app.users.len(), 3);
        assert_eq!(h.app.profile().unwrap().name, "Test Runner");
        assert!(h.app.anchor.is_none());
    }

    #[test]
    fn test_start_pause_resume_stop_flow() {
        let mut h = Harness::new();

        assert!(h.key(KeyCode::Char('s')));
        assert_eq!(h.app.live.status, RunStatus::Tracking);

        h.fix(51.5074, -0.1278, None);
        h.fix(51.5080, -0.1278, Some(3.0));
        h.tick(3);
        assert_eq!(h.app.live.route.len(), 2);
        assert_eq!(h.app.live.elapsed_seconds, 3);
        assert!((h.app.live.current_speed_kmh - 10.8).abs() < 1e-9);

        h.key(KeyCode::Char('p'));
        assert_eq!(h.app.live.status, RunStatus::Paused);
        h.tick(5);
        assert_eq!(h.app.live.elapsed_seconds, 3);

        h.key(KeyCode::Char('s'));
        assert_eq!(h.app.live.status, RunStatus::Tracking);
        h.tick(2);

        h.key(KeyCode::Char('x'));
        assert_eq!(h.app.live.status, RunStatus::Idle);
        assert_eq!(h.app.live, RunSnapshot::default());

        let last = h.app.last_run.unwrap();
        assert_eq!(last.duration_seconds, 5);
        assert!((last.distance_km - 0.067).abs() < 0.001);
        assert_eq!(h.app.last_route.len(), 2);
        assert!(h.app.pending.is_none());

        let week = h.app.profile().unwrap().weekly_stats;
        assert!((week.distance_km - 0.067).abs() < 0.001);
        assert!(!h.app.status.as_ref().unwrap().is_error);
    }

    #[test]
    fn test_stop_when_idle_records_nothing() {
        let mut h = Harness::new();
        h.key(KeyCode::Char('x'));
        assert!(h.app.last_run.is_none());
        assert!(h.app.status.is_none());
    }

    #[test]
    fn test_start_without_sensor_shows_error() {
        let mut h = Harness::new();
        h.source.set_available(false);
        h.key(KeyCode::Char('s'));

        assert_eq!(h.app.live.status, RunStatus::Idle);
        let status = h.app.status.clone().unwrap();
        assert!(status.is_error);
        assert_eq!(status.text, TrackerError::SensorUnavailable.user_message());
    }

    #[test]
    fn test_sensor_failure_aborts_run() {
        let mut h = Harness::new();
        h.key(KeyCode::Char('s'));
        h.fix(0.0, 0.0, None);
        h.tick(4);

        h.source.fail(SensorError::PermissionDenied);
        h.dispatch();

        assert_eq!(h.app.live.status, RunStatus::Idle);
        assert!(h.app.live.route.is_empty());
        assert!(h.app.last_run.is_none());
        assert!(h.app.status.as_ref().unwrap().is_error);
        assert!(h.app.store.history(h.app.user.user_id, 10).unwrap().is_empty());
    }

    #[test]
    fn test_source_end_pauses_and_prompts_to_save() {
        let mut h = Harness::new();
        h.key(KeyCode::Char('s'));
        h.fix(0.0, 0.0, Some(2.0));
        h.fix(0.0, 0.001, Some(2.0));
        h.tick(6);

        assert!(h.source.finish());
        h.dispatch();

        assert_eq!(h.app.live.status, RunStatus::Paused);
        let status = h.app.status.clone().unwrap();
        assert!(!status.is_error);
        assert!(status.text.contains("Press x"));

        h.key(KeyCode::Char('x'));
        assert_eq!(h.app.last_run.unwrap().duration_seconds, 6);
        assert_eq!(h.app.store.history(h.app.user.user_id, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_upload_can_be_retried() {
        let mut inner = SqliteProfileStore::open_in_memory().unwrap();
        let me = store_with_league(&mut inner);
        let failing = Rc::new(Cell::new(true));
        let store = FlakyStore {
            inner,
            failing: failing.clone(),
        };
        let mut h = Harness::with_store(me, store);

        h.key(KeyCode::Char('s'));
        h.fix(0.0, 0.0, Some(2.0));
        h.fix(0.0, 0.01, Some(2.0));
        h.tick(10);
        h.key(KeyCode::Char('x'));

        assert!(h.app.pending.is_some());
        assert!(h.app.status.as_ref().unwrap().is_error);
        assert!(ui::key_hints(&h.app).contains("retry upload"));
        assert_eq!(h.app.profile().unwrap().weekly_stats.distance_km, 0.0);

        failing.set(false);
        h.key(KeyCode::Char('u'));

        assert!(h.app.pending.is_none());
        assert!(!h.app.status.as_ref().unwrap().is_error);
        assert!(h.app.profile().unwrap().weekly_stats.distance_km > 1.0);
        assert_eq!(h.app.store.history(h.app.user.user_id, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_quit_keys() {
        let mut h = Harness::new();
        assert!(!h.key(KeyCode::Esc));
        assert!(!h.key(KeyCode::Char('q')));
        assert!(!h
            .app
            .on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(h.key(KeyCode::Char('z')));
    }

    #[test]
    fn test_screen_and_category_switching() {
        let mut h = Harness::new();

        // Category keys do nothing on the dashboard.
        h.key(KeyCode::Char('3'));
        assert_eq!(h.app.category, LeaderboardCategory::Distance);

        h.key(KeyCode::Char('l'));
        assert_eq!(h.app.state, AppState::Leaderboard);

        h.key(KeyCode::Char('3'));
        assert_eq!(h.app.category, LeaderboardCategory::Pace);
        h.key(KeyCode::Right);
        assert_eq!(h.app.category, LeaderboardCategory::Distance);
        h.key(KeyCode::Left);
        assert_eq!(h.app.category, LeaderboardCategory::Pace);
        h.key(KeyCode::Char('2'));
        assert_eq!(h.app.category, LeaderboardCategory::AvgSpeed);

        h.key(KeyCode::Char('d'));
        assert_eq!(h.app.state, AppState::Dashboard);
    }

    #[test]
    fn test_league_rank_counts_everyone() {
        let h = Harness::new();
        // Nobody has run yet, so ties keep registration order.
        assert_eq!(h.app.league_rank(), 1);
    }

    #[test]
    fn test_dashboard_renders_live_values() {
        let mut h = Harness::new();
        h.key(KeyCode::Char('s'));
        h.fix(51.5074, -0.1278, None);
        h.fix(51.5080, -0.1278, Some(3.0));
        h.tick(65);

        let screen = h.screen();
        assert!(screen.contains("TRACKING"));
        assert!(screen.contains("0.07 km"));
        assert!(screen.contains("10.8 km/h"));
        assert!(screen.contains("00:01:05"));
        assert!(screen.contains("Longest Run"));
        assert!(screen.contains("League Rank"));
        assert!(screen.contains("(p)ause"));
    }

    #[test]
    fn test_leaderboard_renders_all_runners() {
        let mut h = Harness::new();
        h.key(KeyCode::Char('l'));

        let screen = h.screen();
        assert!(screen.contains("Leaderboard"));
        assert!(screen.contains("Test Runner"));
        assert!(screen.contains("Sarah"));
        assert!(screen.contains("Mike"));
        assert!(screen.contains("♛"));
        assert!(screen.contains("Distance"));
    }
}
