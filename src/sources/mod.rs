//! Position sources that can back a run session.

pub mod replay;
pub mod simulated;
pub mod track;

pub use replay::ReplaySource;
pub use simulated::SimulatedSource;
pub use track::{bundled_track_names, RecordedTrack};

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::info;

use crate::config::{Config, SourceKind};
use crate::error::SourceError;
use crate::geo::GeoPoint;
use crate::sensor::{NoSensor, PositionSource};

/// Where the simulated jog starts when nothing else is configured.
pub const DEFAULT_ORIGIN: GeoPoint = GeoPoint {
    latitude: 51.5074,
    longitude: -0.1278,
};

const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Sleep for `total`, waking early once `live` is cleared. Returns whether the
/// flag was still set at the end.
pub(crate) fn sleep_while_live(live: &AtomicBool, total: Duration) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if !live.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

/// Build the position source selected by `config`.
pub fn from_config(config: &Config) -> Result<Box<dyn PositionSource>, SourceError> {
    let source: Box<dyn PositionSource> = match config.source {
        SourceKind::Simulated => {
            info!(
                "using simulated source at {:.1} m/s (seed {})",
                config.simulated_speed_mps, config.seed
            );
            Box::new(SimulatedSource::new(
                DEFAULT_ORIGIN,
                config.simulated_speed_mps,
                config.seed,
            ))
        }
        SourceKind::Replay => {
            let name = config
                .replay_track
                .clone()
                .or_else(|| bundled_track_names().into_iter().next())
                .ok_or(SourceError::Empty)?;
            let track = RecordedTrack::load(&name)?;
            info!(
                "replaying '{}' ({} fixes) at {}x",
                track.name,
                track.samples.len(),
                config.playback_rate
            );
            Box::new(ReplaySource::new(track, config.playback_rate))
        }
        SourceKind::Disabled => {
            info!("position sensing disabled");
            Box::new(NoSensor)
        }
    };
    Ok(source)
}
