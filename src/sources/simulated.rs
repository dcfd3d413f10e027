use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::sleep_while_live;
use crate::error::SensorError;
use crate::geo::GeoPoint;
use crate::sensor::{FixOptions, PositionSample, PositionSource, RunEvent, SharedSink, SubscriptionId};

/// Meters per degree of latitude.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Nominal time between fixes; actual spacing varies by ±40%.
pub const DEFAULT_FIX_INTERVAL: Duration = Duration::from_secs(2);

struct Walker {
    position: GeoPoint,
    heading: f64,
    speed_mps: f64,
    rng: StdRng,
}

impl Walker {
    fn next_interval(&mut self, nominal: Duration) -> Duration {
        nominal.mul_f64(self.rng.gen_range(0.6..1.4))
    }

    fn step(&mut self, dt: Duration) -> PositionSample {
        self.heading += self.rng.gen_range(-0.3..0.3);
        let speed = self.speed_mps * self.rng.gen_range(0.85..1.15);
        let meters = speed * dt.as_secs_f64();

        let lat = self.position.latitude + meters * self.heading.cos() / METERS_PER_DEGREE;
        let lon_scale = METERS_PER_DEGREE * lat.to_radians().cos().max(0.01);
        let lon = self.position.longitude + meters * self.heading.sin() / lon_scale;
        self.position = GeoPoint::new(lat.clamp(-90.0, 90.0), wrap_longitude(lon));

        // Receiver noise of a couple of meters on the reported fix.
        let noisy = GeoPoint::new(
            (self.position.latitude + self.rng.gen_range(-2e-5..2e-5)).clamp(-90.0, 90.0),
            wrap_longitude(self.position.longitude + self.rng.gen_range(-2e-5..2e-5)),
        );
        let reported = if self.rng.gen_bool(0.1) {
            None
        } else {
            Some(speed)
        };

        PositionSample::new(noisy, reported, Utc::now())
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

/// A seeded random jog: noisy fixes at irregular intervals around a steady pace.
pub struct SimulatedSource {
    walker: Arc<Mutex<Walker>>,
    interval: Duration,
    next_id: u64,
    running: HashMap<SubscriptionId, Arc<AtomicBool>>,
}

impl SimulatedSource {
    pub fn new(origin: GeoPoint, speed_mps: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let heading = rng.gen_range(0.0..std::f64::consts::TAU);
        Self {
            walker: Arc::new(Mutex::new(Walker {
                position: origin,
                heading,
                speed_mps: speed_mps.max(0.0),
                rng,
            })),
            interval: DEFAULT_FIX_INTERVAL,
            next_id: 0,
            running: HashMap::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Advance the jog by `dt` and return the resulting fix.
    pub fn next_fix(&self, dt: Duration) -> PositionSample {
        lock(&self.walker).step(dt)
    }
}

fn lock(walker: &Mutex<Walker>) -> MutexGuard<'_, Walker> {
    walker.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PositionSource for SimulatedSource {
    fn is_available(&self) -> bool {
        true
    }

    fn current_position(&mut self, _options: &FixOptions) -> Result<PositionSample, SensorError> {
        let walker = lock(&self.walker);
        Ok(PositionSample::new(walker.position, None, Utc::now()))
    }

    fn subscribe(
        &mut self,
        sink: SharedSink,
        _options: &FixOptions,
    ) -> Result<SubscriptionId, SensorError> {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let live = Arc::new(AtomicBool::new(true));
        self.running.insert(id, live.clone());

        let walker = self.walker.clone();
        let nominal = self.interval;
        thread::spawn(move || loop {
            let wait = lock(&walker).next_interval(nominal);
            if !sleep_while_live(&live, wait) {
                break;
            }
            let sample = lock(&walker).step(wait);
            if !sink.emit(RunEvent::Position {
                subscription: id,
                sample,
            }) {
                break;
            }
        });

        debug!("simulated subscription {id:?} started");
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        if let Some(live) = self.running.remove(&id) {
            live.store(false, Ordering::Release);
        }
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        for (_, live) in self.running.drain() {
            live.store(false, Ordering::Release);
        }
    }
}
