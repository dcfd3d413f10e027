//! Live run tracking.
//!
//! A [`RunSession`] owns one run at a time. Position fixes and cadence ticks
//! reach it as [`RunEvent`]s on a channel and are applied one at a time by
//! whoever drives the event loop, so the session never needs a lock of its
//! own. Each tracking period gets a fresh subscription and timer; events
//! tagged with anything else are dropped.

use std::mem;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::cadence::{Cadence, TimerHandle};
use crate::error::{SensorError, TrackerError};
use crate::geo::{great_circle_distance, GeoPoint, MPS_TO_KMH};
use crate::profile::UserContext;
use crate::sensor::{
    FixOptions, PositionSample, PositionSource, RunEvent, SharedSink, SubscriptionId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum RunStatus {
    Idle,
    Tracking,
    Paused,
}

/// Handles acquired for exactly one `Tracking` period.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TrackingPeriod {
    subscription: SubscriptionId,
    timer: TimerHandle,
}

/// Read-only view pushed to the presentation layer after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    pub status: RunStatus,
    pub route: Vec<GeoPoint>,
    pub total_distance_km: f64,
    pub current_speed_kmh: f64,
    pub elapsed_seconds: u64,
}

impl Default for RunSnapshot {
    fn default() -> Self {
        Self {
            status: RunStatus::Idle,
            route: Vec::new(),
            total_distance_km: 0.0,
            current_speed_kmh: 0.0,
            elapsed_seconds: 0,
        }
    }
}

/// Totals of a finished run, as handed to the profile store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub distance_km: f64,
    pub avg_speed_kmh: f64,
    pub duration_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

impl RunSummary {
    /// Minutes per kilometer at the average speed; 0 when standing still.
    pub fn pace_min_per_km(&self) -> f64 {
        crate::util::pace_from_speed(self.avg_speed_kmh)
    }
}

/// What a user-initiated stop produces.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRun {
    pub user: UserContext,
    pub summary: RunSummary,
    pub route: Vec<GeoPoint>,
}

pub struct RunSession<S: PositionSource, C: Cadence> {
    source: S,
    cadence: C,
    sink: SharedSink,
    options: FixOptions,
    status: RunStatus,
    route: Vec<GeoPoint>,
    total_distance_km: f64,
    current_speed_kmh: f64,
    elapsed_seconds: u64,
    period: Option<TrackingPeriod>,
    observers: Vec<Sender<RunSnapshot>>,
}

impl<S: PositionSource, C: Cadence> RunSession<S, C> {
    /// Create an idle session whose source and cadence deliver into `sink`.
    pub fn new(source: S, cadence: C, sink: SharedSink) -> Self {
        Self {
            source,
            cadence,
            sink,
            options: FixOptions::default(),
            status: RunStatus::Idle,
            route: Vec::new(),
            total_distance_km: 0.0,
            current_speed_kmh: 0.0,
            elapsed_seconds: 0,
            period: None,
            observers: Vec::new(),
        }
    }

    /// Create an idle session together with the receiving end of its events.
    pub fn with_channel(source: S, cadence: C) -> (Self, Receiver<RunEvent>) {
        let (tx, rx) = mpsc::channel::<RunEvent>();
        let sink: SharedSink = Arc::new(tx);
        (Self::new(source, cadence, sink), rx)
    }

    pub fn with_options(mut self, options: FixOptions) -> Self {
        self.options = options;
        self
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn route(&self) -> &[GeoPoint] {
        &self.route
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    pub fn current_speed_kmh(&self) -> f64 {
        self.current_speed_kmh
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// Whether a subscription and timer are currently held.
    pub fn holds_sensor(&self) -> bool {
        self.period.is_some()
    }

    /// One-shot fix, used to center the view before a run starts.
    pub fn locate(&mut self) -> Result<PositionSample, SensorError> {
        self.source.current_position(&self.options)
    }

    pub fn start(&mut self) -> Result<(), TrackerError> {
        if self.status != RunStatus::Idle {
            return Ok(());
        }
        if !self.source.is_available() {
            warn!("cannot start run: position sensing unavailable");
            return Err(TrackerError::SensorUnavailable);
        }
        self.source.reset();
        let period = self.acquire().map_err(subscribe_error)?;

        self.reset_accumulators();
        self.period = Some(period);
        self.status = RunStatus::Tracking;
        info!(
            "run started (subscription {:?}, timer {:?})",
            period.subscription, period.timer
        );
        self.publish();
        Ok(())
    }

    /// Idempotent: pausing anything but a tracking run changes nothing.
    pub fn pause(&mut self) {
        if self.status != RunStatus::Tracking {
            return;
        }
        self.release();
        self.status = RunStatus::Paused;
        info!(
            "run paused at {:.3} km, {} s",
            self.total_distance_km, self.elapsed_seconds
        );
        self.publish();
    }

    pub fn resume(&mut self) -> Result<(), TrackerError> {
        if self.status != RunStatus::Paused {
            return Ok(());
        }
        if !self.source.is_available() {
            warn!("cannot resume run: position sensing unavailable");
            return Err(TrackerError::SensorUnavailable);
        }
        match self.acquire() {
            Ok(period) => {
                self.period = Some(period);
                self.status = RunStatus::Tracking;
                info!("run resumed (subscription {:?})", period.subscription);
                self.publish();
                Ok(())
            }
            Err(SensorError::Unavailable) => Err(TrackerError::SensorUnavailable),
            Err(err) => {
                self.abort(&err);
                Err(err.into())
            }
        }
    }

    /// Finish the run for `user`. Returns `None` when no run is in progress.
    pub fn stop(&mut self, user: &UserContext) -> Option<CompletedRun> {
        if self.status == RunStatus::Idle {
            return None;
        }
        self.release();

        let summary = build_summary(self, Utc::now());
        let route = mem::take(&mut self.route);
        self.reset_accumulators();
        self.status = RunStatus::Idle;
        info!(
            "run finished for {}: {:.2} km in {} s",
            user.user_id, summary.distance_km, summary.duration_seconds
        );
        self.publish();

        Some(CompletedRun {
            user: user.clone(),
            summary,
            route,
        })
    }

    /// Apply one event. A failure from the live subscription aborts the run
    /// and is returned. The end of the live subscription pauses the run.
    /// Every other event is either applied or dropped.
    pub fn handle_event(&mut self, event: RunEvent) -> Result<(), TrackerError> {
        match event {
            RunEvent::Position {
                subscription,
                sample,
            } => {
                if self.is_live_subscription(subscription) {
                    self.on_sample(sample);
                } else {
                    trace!("dropping fix from stale subscription {subscription:?}");
                }
                Ok(())
            }
            RunEvent::Tick { timer } => {
                if self.status == RunStatus::Tracking
                    && matches!(self.period, Some(p) if p.timer == timer)
                {
                    self.elapsed_seconds += 1;
                    self.publish();
                } else {
                    trace!("dropping tick from stale timer {timer:?}");
                }
                Ok(())
            }
            RunEvent::SensorFailed {
                subscription,
                error,
            } => {
                if !self.is_live_subscription(subscription) {
                    trace!("ignoring failure from stale subscription {subscription:?}");
                    return Ok(());
                }
                self.abort(&error);
                Err(error.into())
            }
            RunEvent::SourceEnded { subscription } => {
                if self.is_live_subscription(subscription) {
                    info!("position source ran out of fixes");
                    self.pause();
                } else {
                    trace!("ignoring end of stale subscription {subscription:?}");
                }
                Ok(())
            }
        }
    }

    /// Apply every event already queued on `events`. Returns how many were
    /// handled, or the first error.
    pub fn pump(&mut self, events: &Receiver<RunEvent>) -> Result<usize, TrackerError> {
        let mut handled = 0;
        for event in events.try_iter() {
            self.handle_event(event)?;
            handled += 1;
        }
        Ok(handled)
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            status: self.status,
            route: self.route.clone(),
            total_distance_km: self.total_distance_km,
            current_speed_kmh: if self.status == RunStatus::Idle {
                0.0
            } else {
                self.current_speed_kmh
            },
            elapsed_seconds: self.elapsed_seconds,
        }
    }

    /// Receive a snapshot now and after every later mutation.
    pub fn subscribe_snapshots(&mut self) -> Receiver<RunSnapshot> {
        let (tx, rx) = mpsc::channel();
        if tx.send(self.snapshot()).is_ok() {
            self.observers.push(tx);
        }
        rx
    }

    fn on_sample(&mut self, sample: PositionSample) {
        let point = sample.point;
        if !point.is_valid() {
            warn!("dropping invalid fix {point:?}");
            return;
        }

        if let Some(last) = self.route.last() {
            self.total_distance_km += great_circle_distance(*last, point);
        }
        self.route.push(point);

        if let Some(speed) = sample.speed_mps.filter(|s| s.is_finite() && *s >= 0.0) {
            self.current_speed_kmh = speed * MPS_TO_KMH;
        }

        debug!(
            "fix {:.6},{:.6} -> {:.3} km, {:.1} km/h",
            point.latitude, point.longitude, self.total_distance_km, self.current_speed_kmh
        );
        self.publish();
    }

    fn is_live_subscription(&self, id: SubscriptionId) -> bool {
        self.status == RunStatus::Tracking && matches!(self.period, Some(p) if p.subscription == id)
    }

    fn acquire(&mut self) -> Result<TrackingPeriod, SensorError> {
        let subscription = self.source.subscribe(self.sink.clone(), &self.options)?;
        let timer = self.cadence.arm(self.sink.clone());
        Ok(TrackingPeriod {
            subscription,
            timer,
        })
    }

    fn release(&mut self) {
        if let Some(period) = self.period.take() {
            self.source.unsubscribe(period.subscription);
            self.cadence.disarm(period.timer);
        }
    }

    /// Forced stop: the run is discarded, not summarised.
    fn abort(&mut self, error: &SensorError) {
        self.release();
        warn!(
            "run aborted by sensor failure ({error}); discarding {:.3} km over {} s",
            self.total_distance_km, self.elapsed_seconds
        );
        self.route.clear();
        self.reset_accumulators();
        self.status = RunStatus::Idle;
        self.publish();
    }

    fn reset_accumulators(&mut self) {
        self.route.clear();
        self.total_distance_km = 0.0;
        self.current_speed_kmh = 0.0;
        self.elapsed_seconds = 0;
    }

    fn publish(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.observers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

impl<S: PositionSource, C: Cadence> Drop for RunSession<S, C> {
    fn drop(&mut self) {
        self.release();
    }
}

fn subscribe_error(err: SensorError) -> TrackerError {
    match err {
        SensorError::Unavailable => TrackerError::SensorUnavailable,
        other => TrackerError::Sensor(other),
    }
}

/// Summarise the session's current accumulators as of `at`.
///
/// The average is distance over tracked time. Before the first cadence tick
/// there is no tracked time, so the last reported speed stands in.
pub fn build_summary<S: PositionSource, C: Cadence>(
    session: &RunSession<S, C>,
    at: DateTime<Utc>,
) -> RunSummary {
    let avg_speed_kmh = if session.elapsed_seconds > 0 {
        session.total_distance_km / (session.elapsed_seconds as f64 / 3600.0)
    } else {
        session.current_speed_kmh
    };

    RunSummary {
        distance_km: session.total_distance_km,
        avg_speed_kmh,
        duration_seconds: session.elapsed_seconds,
        timestamp: at,
    }
}
