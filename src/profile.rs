use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use log::{debug, info};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::app_dirs::AppDirs;
use crate::error::{ProfileError, SubmitError};
use crate::geo::GeoPoint;
use crate::session::{CompletedRun, RunSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who a finished run belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: UserId,
    pub display_name: String,
}

impl UserContext {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}

/// Best-of values for one ISO week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub distance_km: f64,
    pub avg_speed_kmh: f64,
    /// Lowest pace of the week; 0 until a moving run is recorded.
    pub pace_min_per_km: f64,
}

impl WeeklyStats {
    /// Fold one run into the aggregate.
    pub fn merge(&self, summary: &RunSummary) -> WeeklyStats {
        let pace = summary.pace_min_per_km();
        let pace_min_per_km = if pace > 0.0 && (self.pace_min_per_km <= 0.0 || pace < self.pace_min_per_km)
        {
            pace
        } else {
            self.pace_min_per_km
        };

        WeeklyStats {
            distance_km: self.distance_km.max(summary.distance_km),
            avg_speed_kmh: self.avg_speed_kmh.max(summary.avg_speed_kmh),
            pace_min_per_km,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub avatar_url: String,
    pub weekly_stats: WeeklyStats,
}

impl UserProfile {
    pub fn context(&self) -> UserContext {
        UserContext::new(self.id, self.name.clone())
    }
}

/// One row of run history.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub user_id: UserId,
    pub summary: RunSummary,
    pub route: Vec<GeoPoint>,
}

/// Monday of the ISO week containing `at`, in UTC.
pub fn week_start(at: DateTime<Utc>) -> NaiveDate {
    let date = at.date_naive();
    date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Storage for profiles, weekly aggregates and run history.
pub trait ProfileStore {
    fn register(&mut self, name: &str) -> Result<UserProfile, ProfileError>;
    fn user(&self, id: UserId) -> Result<Option<UserProfile>, ProfileError>;
    /// Every profile, with stats for the current week.
    fn users(&self) -> Result<Vec<UserProfile>, ProfileError>;
    /// Append to history and merge into that week's aggregate.
    fn record_run(&mut self, run: &CompletedRun) -> Result<WeeklyStats, ProfileError>;
    /// Most recent runs first.
    fn history(&self, id: UserId, limit: usize) -> Result<Vec<RunRecord>, ProfileError>;
}

/// Persist a finished run, handing it back on failure so it can be retried.
pub fn submit_run<P: ProfileStore + ?Sized>(
    store: &mut P,
    run: CompletedRun,
) -> Result<WeeklyStats, SubmitError> {
    match store.record_run(&run) {
        Ok(stats) => Ok(stats),
        Err(source) => Err(SubmitError {
            run: Box::new(run),
            source,
        }),
    }
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        avatar_url TEXT NOT NULL DEFAULT '',
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        distance_km REAL NOT NULL,
        avg_speed_kmh REAL NOT NULL,
        duration_seconds INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        route TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_runs_user_timestamp ON runs(user_id, timestamp);

    CREATE TABLE IF NOT EXISTS weekly_stats (
        user_id INTEGER NOT NULL REFERENCES users(id),
        week_start TEXT NOT NULL,
        distance_km REAL NOT NULL,
        avg_speed_kmh REAL NOT NULL,
        pace_min_per_km REAL NOT NULL,
        PRIMARY KEY (user_id, week_start)
    );
"#;

/// SQLite-backed profile store
#[derive(Debug)]
pub struct SqliteProfileStore {
    conn: Connection,
}

impl SqliteProfileStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, ProfileError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        debug!("opening profile store at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// Open the store at the default state location.
    pub fn open_default() -> Result<Self, ProfileError> {
        let path = AppDirs::db_path().unwrap_or_else(|| "strides.db".into());
        Self::open(&path)
    }

    pub fn open_in_memory() -> Result<Self, ProfileError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, ProfileError> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteProfileStore { conn })
    }

    /// Aggregate for `id` in the week starting on `week`, zero when absent.
    pub fn weekly_stats(&self, id: UserId, week: NaiveDate) -> Result<WeeklyStats, ProfileError> {
        Ok(read_weekly(&self.conn, id, week)?.unwrap_or_default())
    }

    /// Every profile with stats for the week starting on `week`.
    pub fn users_in_week(&self, week: NaiveDate) -> Result<Vec<UserProfile>, ProfileError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT u.id, u.name, u.avatar_url,
                   COALESCE(w.distance_km, 0), COALESCE(w.avg_speed_kmh, 0),
                   COALESCE(w.pace_min_per_km, 0)
            FROM users u
            LEFT JOIN weekly_stats w ON w.user_id = u.id AND w.week_start = ?1
            ORDER BY u.id
            "#,
        )?;

        let rows = stmt.query_map([week.to_string()], profile_from_row)?;
        let mut users = Vec::new();
        for user in rows {
            users.push(user?);
        }
        Ok(users)
    }

    fn user_in_week(&self, id: UserId, week: NaiveDate) -> Result<Option<UserProfile>, ProfileError> {
        let user = self
            .conn
            .query_row(
                r#"
                SELECT u.id, u.name, u.avatar_url,
                       COALESCE(w.distance_km, 0), COALESCE(w.avg_speed_kmh, 0),
                       COALESCE(w.pace_min_per_km, 0)
                FROM users u
                LEFT JOIN weekly_stats w ON w.user_id = u.id AND w.week_start = ?2
                WHERE u.id = ?1
                "#,
                params![id.0, week.to_string()],
                profile_from_row,
            )
            .optional()?;
        Ok(user)
    }
}

impl ProfileStore for SqliteProfileStore {
    fn register(&mut self, name: &str) -> Result<UserProfile, ProfileError> {
        self.conn
            .execute("INSERT INTO users (name) VALUES (?1)", [name])?;
        let id = UserId(self.conn.last_insert_rowid());
        info!("registered user {id} ({name})");

        Ok(UserProfile {
            id,
            name: name.to_string(),
            avatar_url: String::new(),
            weekly_stats: WeeklyStats::default(),
        })
    }

    fn user(&self, id: UserId) -> Result<Option<UserProfile>, ProfileError> {
        self.user_in_week(id, week_start(Utc::now()))
    }

    fn users(&self) -> Result<Vec<UserProfile>, ProfileError> {
        self.users_in_week(week_start(Utc::now()))
    }

    fn record_run(&mut self, run: &CompletedRun) -> Result<WeeklyStats, ProfileError> {
        let user_id = run.user.user_id;
        let summary = &run.summary;
        let week = week_start(summary.timestamp);
        let route = serde_json::to_string(&run.route)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let tx = self.conn.transaction()?;

        let known: Option<i64> = tx
            .query_row("SELECT id FROM users WHERE id = ?1", [user_id.0], |row| row.get(0))
            .optional()?;
        if known.is_none() {
            return Err(ProfileError::UnknownUser(user_id));
        }

        tx.execute(
            r#"
            INSERT INTO runs (user_id, distance_km, avg_speed_kmh, duration_seconds, timestamp, route)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                user_id.0,
                summary.distance_km,
                summary.avg_speed_kmh,
                summary.duration_seconds,
                summary.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                route,
            ],
        )?;

        let merged = read_weekly(&tx, user_id, week)?
            .unwrap_or_default()
            .merge(summary);

        tx.execute(
            r#"
            INSERT INTO weekly_stats (user_id, week_start, distance_km, avg_speed_kmh, pace_min_per_km)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (user_id, week_start) DO UPDATE SET
                distance_km = excluded.distance_km,
                avg_speed_kmh = excluded.avg_speed_kmh,
                pace_min_per_km = excluded.pace_min_per_km
            "#,
            params![
                user_id.0,
                week.to_string(),
                merged.distance_km,
                merged.avg_speed_kmh,
                merged.pace_min_per_km,
            ],
        )?;

        tx.commit()?;
        info!(
            "recorded run for user {user_id}: {:.2} km, week of {week} now {:.2} km best",
            summary.distance_km, merged.distance_km
        );
        Ok(merged)
    }

    fn history(&self, id: UserId, limit: usize) -> Result<Vec<RunRecord>, ProfileError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, distance_km, avg_speed_kmh, duration_seconds, timestamp, route
            FROM runs
            WHERE user_id = ?1
            ORDER BY timestamp DESC, id DESC
            LIMIT ?2
            "#,
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![id.0, limit], |row| {
            let timestamp: String = row.get(5)?;
            let route: String = row.get(6)?;
            Ok(RunRecord {
                id: row.get(0)?,
                user_id: UserId(row.get(1)?),
                summary: RunSummary {
                    distance_km: row.get(2)?,
                    avg_speed_kmh: row.get(3)?,
                    duration_seconds: row.get(4)?,
                    timestamp: parse_timestamp(5, &timestamp)?,
                },
                route: serde_json::from_str(&route)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }
}

fn read_weekly(
    conn: &Connection,
    id: UserId,
    week: NaiveDate,
) -> rusqlite::Result<Option<WeeklyStats>> {
    conn.query_row(
        r#"
        SELECT distance_km, avg_speed_kmh, pace_min_per_km
        FROM weekly_stats
        WHERE user_id = ?1 AND week_start = ?2
        "#,
        params![id.0, week.to_string()],
        |row| {
            Ok(WeeklyStats {
                distance_km: row.get(0)?,
                avg_speed_kmh: row.get(1)?,
                pace_min_per_km: row.get(2)?,
            })
        },
    )
    .optional()
}

fn profile_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: UserId(row.get(0)?),
        name: row.get(1)?,
        avatar_url: row.get(2)?,
        weekly_stats: WeeklyStats {
            distance_km: row.get(3)?,
            avg_speed_kmh: row.get(4)?,
            pace_min_per_km: row.get(5)?,
        },
    })
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
