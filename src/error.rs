//! Error types shared across the crate.
//!
//! Everything that can fail originates at one of two boundaries: the position
//! sensor or the profile store. Distance and time accounting are total.

use std::time::Duration;
use thiserror::Error;

use crate::profile::UserId;
use crate::session::CompletedRun;

/// Failures reported by a position source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("position sensing is not available on this device")]
    Unavailable,

    #[error("permission to read the position was denied")]
    PermissionDenied,

    #[error("no position fix within {0:?}")]
    Timeout(Duration),

    #[error("position sensor failure: {0}")]
    Hardware(String),
}

/// Errors surfaced by [`crate::session::RunSession`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    /// The capability was absent when a tracking period was requested.
    #[error("location services are unavailable")]
    SensorUnavailable,

    /// The active subscription failed; the run was aborted without a summary.
    #[error("location error: {0}")]
    Sensor(#[from] SensorError),
}

impl TrackerError {
    /// Short message suitable for a status line.
    pub fn user_message(&self) -> String {
        match self {
            TrackerError::SensorUnavailable => {
                "Location is not supported here. Pick another source with --source.".to_string()
            }
            TrackerError::Sensor(SensorError::PermissionDenied) => {
                "Could not get position. Please enable location services.".to_string()
            }
            TrackerError::Sensor(e) => format!("Run aborted: {e}"),
        }
    }
}

/// Profile store failures.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown user {0}")]
    UnknownUser(UserId),
}

/// A completed run that could not be persisted. The run is handed back so the
/// caller can retry the submission.
#[derive(Error, Debug)]
#[error("could not save run: {source}")]
pub struct SubmitError {
    pub run: Box<CompletedRun>,
    #[source]
    pub source: ProfileError,
}

/// Failures while loading a recorded track for replay.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed track: {0}")]
    Csv(#[from] csv::Error),

    #[error("no bundled track named '{0}'")]
    UnknownTrack(String),

    #[error("track contains no usable fixes")]
    Empty,
}
