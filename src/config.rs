use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sensor::FixOptions;

/// Which position source backs the dashboard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Simulated,
    Replay,
    #[serde(rename = "none")]
    #[value(name = "none")]
    #[strum(to_string = "none")]
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Profile used for recorded runs; registered on first launch.
    pub user_id: Option<i64>,
    pub display_name: String,
    pub source: SourceKind,
    /// Bundled track name or path to a CSV file.
    pub replay_track: Option<String>,
    pub playback_rate: f64,
    pub simulated_speed_mps: f64,
    pub seed: u64,
    pub fix_timeout_secs: u64,
    pub high_accuracy: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: None,
            display_name: "Runner".to_string(),
            source: SourceKind::Simulated,
            replay_track: None,
            playback_rate: 1.0,
            simulated_speed_mps: 2.8,
            seed: 2024,
            fix_timeout_secs: 20,
            high_accuracy: true,
        }
    }
}

impl Config {
    pub fn fix_options(&self) -> FixOptions {
        FixOptions {
            high_accuracy: self.high_accuracy,
            max_age: Duration::ZERO,
            timeout: Duration::from_secs(self.fix_timeout_secs.max(1)),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "strides") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("strides_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("ignoring unreadable config {}: {e}", self.path.display());
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(std::io::Error::other)?;
        fs::write(&self.path, data)
    }
}
