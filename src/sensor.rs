//! The position-sensing boundary.
//!
//! A [`PositionSource`] pushes fixes into an [`EventSink`] from whatever thread
//! it likes. Every event is tagged with the subscription that produced it so
//! the consumer can recognise callbacks that arrive after the subscription
//! was released.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cadence::TimerHandle;
use crate::error::SensorError;
use crate::geo::GeoPoint;

/// A single fix reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub point: GeoPoint,
    /// Instantaneous ground speed in m/s, when the sensor reports one.
    pub speed_mps: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    pub fn new(point: GeoPoint, speed_mps: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            point,
            speed_mps,
            timestamp,
        }
    }

    pub fn now(latitude: f64, longitude: f64, speed_mps: Option<f64>) -> Self {
        Self::new(GeoPoint::new(latitude, longitude), speed_mps, Utc::now())
    }
}

/// How fixes should be acquired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixOptions {
    pub high_accuracy: bool,
    /// Oldest cached fix that may be returned; zero disables caching.
    pub max_age: Duration,
    /// Longest wait for a single fix before the source reports a timeout.
    pub timeout: Duration,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            max_age: Duration::ZERO,
            timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Events feeding a run session.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Position {
        subscription: SubscriptionId,
        sample: PositionSample,
    },
    SensorFailed {
        subscription: SubscriptionId,
        error: SensorError,
    },
    /// The source has nothing more to deliver on this subscription.
    SourceEnded {
        subscription: SubscriptionId,
    },
    Tick {
        timer: TimerHandle,
    },
}

/// Destination for run events, shared with producer threads.
pub trait EventSink: Send + Sync {
    /// Deliver an event. Returns false once nobody is listening anymore.
    fn emit(&self, event: RunEvent) -> bool;
}

pub type SharedSink = Arc<dyn EventSink>;

impl EventSink for Sender<RunEvent> {
    fn emit(&self, event: RunEvent) -> bool {
        self.send(event).is_ok()
    }
}

/// Continuous position-sensing capability.
pub trait PositionSource {
    /// Whether the capability exists at all on this device.
    fn is_available(&self) -> bool;

    /// One-shot fix.
    fn current_position(&mut self, options: &FixOptions) -> Result<PositionSample, SensorError>;

    /// Start delivering fixes (and failures) into `sink` until unsubscribed.
    fn subscribe(
        &mut self,
        sink: SharedSink,
        options: &FixOptions,
    ) -> Result<SubscriptionId, SensorError>;

    /// Stop a subscription. Safe to call on an already released id.
    fn unsubscribe(&mut self, id: SubscriptionId);

    /// Forget any progress kept between subscriptions, ahead of a new run.
    fn reset(&mut self) {}
}

impl<T: PositionSource + ?Sized> PositionSource for Box<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn current_position(&mut self, options: &FixOptions) -> Result<PositionSample, SensorError> {
        (**self).current_position(options)
    }

    fn subscribe(
        &mut self,
        sink: SharedSink,
        options: &FixOptions,
    ) -> Result<SubscriptionId, SensorError> {
        (**self).subscribe(sink, options)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        (**self).unsubscribe(id)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// A device without position sensing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSensor;

impl PositionSource for NoSensor {
    fn is_available(&self) -> bool {
        false
    }

    fn current_position(&mut self, _options: &FixOptions) -> Result<PositionSample, SensorError> {
        Err(SensorError::Unavailable)
    }

    fn subscribe(
        &mut self,
        _sink: SharedSink,
        _options: &FixOptions,
    ) -> Result<SubscriptionId, SensorError> {
        Err(SensorError::Unavailable)
    }

    fn unsubscribe(&mut self, _id: SubscriptionId) {}
}

#[derive(Default)]
struct ScriptedInner {
    unavailable: bool,
    refuse_next: Option<SensorError>,
    next_id: u64,
    active: Option<(SubscriptionId, SharedSink)>,
    subscribe_calls: usize,
    released: Vec<SubscriptionId>,
    reset_calls: usize,
    last_fix: Option<PositionSample>,
}

/// Position source driven by the caller, for tests and headless runs.
///
/// Clones share state: keep one clone to script fixes while the session owns
/// the other.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    inner: Arc<Mutex<ScriptedInner>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.lock().unavailable = !available;
    }

    /// Make the next `subscribe` call fail with `error`.
    pub fn refuse_next_subscribe(&self, error: SensorError) {
        self.lock().refuse_next = Some(error);
    }

    /// Deliver a fix on the live subscription. Returns false when there is
    /// none or the receiver is gone.
    pub fn push_sample(&self, sample: PositionSample) -> bool {
        let mut inner = self.lock();
        inner.last_fix = Some(sample);
        match &inner.active {
            Some((subscription, sink)) => sink.emit(RunEvent::Position {
                subscription: *subscription,
                sample,
            }),
            None => false,
        }
    }

    pub fn push_fix(&self, latitude: f64, longitude: f64, speed_mps: Option<f64>) -> bool {
        self.push_sample(PositionSample::now(latitude, longitude, speed_mps))
    }

    /// Report a runtime failure on the live subscription.
    pub fn fail(&self, error: SensorError) -> bool {
        let inner = self.lock();
        match &inner.active {
            Some((subscription, sink)) => sink.emit(RunEvent::SensorFailed {
                subscription: *subscription,
                error,
            }),
            None => false,
        }
    }

    /// Report that the live subscription has run dry.
    pub fn finish(&self) -> bool {
        let inner = self.lock();
        match &inner.active {
            Some((subscription, sink)) => sink.emit(RunEvent::SourceEnded {
                subscription: *subscription,
            }),
            None => false,
        }
    }

    pub fn active_subscription(&self) -> Option<SubscriptionId> {
        self.lock().active.as_ref().map(|(id, _)| *id)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.lock().subscribe_calls
    }

    pub fn released(&self) -> Vec<SubscriptionId> {
        self.lock().released.clone()
    }

    pub fn reset_calls(&self) -> usize {
        self.lock().reset_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptedInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PositionSource for ScriptedSource {
    fn is_available(&self) -> bool {
        !self.lock().unavailable
    }

    fn current_position(&mut self, _options: &FixOptions) -> Result<PositionSample, SensorError> {
        let inner = self.lock();
        if inner.unavailable {
            return Err(SensorError::Unavailable);
        }
        inner
            .last_fix
            .ok_or(SensorError::Timeout(Duration::ZERO))
    }

    fn subscribe(
        &mut self,
        sink: SharedSink,
        _options: &FixOptions,
    ) -> Result<SubscriptionId, SensorError> {
        let mut inner = self.lock();
        inner.subscribe_calls += 1;
        if inner.unavailable {
            return Err(SensorError::Unavailable);
        }
        if let Some(err) = inner.refuse_next.take() {
            return Err(err);
        }
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.active = Some((id, sink));
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        let mut inner = self.lock();
        if matches!(inner.active, Some((active, _)) if active == id) {
            inner.active = None;
        }
        if !inner.released.contains(&id) {
            inner.released.push(id);
        }
    }

    fn reset(&mut self) {
        self.lock().reset_calls += 1;
    }
}
