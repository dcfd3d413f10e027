use chrono::{DateTime, Utc};
use include_dir::{include_dir, Dir};
use itertools::Itertools;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::error::SourceError;
use crate::geo::{route_distance, GeoPoint};
use crate::sensor::PositionSample;

static TRACK_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/tracks");

#[derive(Debug, Deserialize)]
struct TrackRow {
    timestamp: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    speed_mps: Option<f64>,
}

/// A recorded sequence of fixes, as read from `timestamp,latitude,longitude,speed_mps`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTrack {
    pub name: String,
    pub samples: Vec<PositionSample>,
}

impl RecordedTrack {
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, SourceError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut samples = Vec::new();
        for row in rdr.deserialize::<TrackRow>() {
            let row = row?;
            samples.push(PositionSample::new(
                GeoPoint::new(row.latitude, row.longitude),
                row.speed_mps,
                row.timestamp,
            ));
        }

        if samples.is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(RecordedTrack {
            name: name.to_string(),
            samples,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = std::fs::File::open(path)?;
        Self::from_reader(&name, file)
    }

    /// One of the tracks compiled into the binary, by name without extension.
    pub fn bundled(name: &str) -> Result<Self, SourceError> {
        let file = TRACK_DIR
            .get_file(format!("{name}.csv"))
            .ok_or_else(|| SourceError::UnknownTrack(name.to_string()))?;
        Self::from_reader(name, file.contents())
    }

    /// A file path if one exists, otherwise a bundled track name.
    pub fn load(name_or_path: &str) -> Result<Self, SourceError> {
        let path = Path::new(name_or_path);
        if path.is_file() {
            Self::from_path(path)
        } else {
            Self::bundled(name_or_path)
        }
    }

    pub fn points(&self) -> Vec<GeoPoint> {
        self.samples.iter().map(|s| s.point).collect()
    }

    pub fn distance_km(&self) -> f64 {
        route_distance(&self.points())
    }

    /// Recorded time between the first and last fix.
    pub fn duration(&self) -> Duration {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp)
                .to_std()
                .unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }
}

pub fn bundled_track_names() -> Vec<String> {
    TRACK_DIR
        .files()
        .filter(|f| f.path().extension().is_some_and(|ext| ext == "csv"))
        .filter_map(|f| f.path().file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .sorted()
        .collect()
}
