use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};

use super::{sleep_while_live, RecordedTrack};
use crate::error::SensorError;
use crate::sensor::{FixOptions, PositionSample, PositionSource, RunEvent, SharedSink, SubscriptionId};

/// Plays a recorded track back as if it were a live sensor.
///
/// Fixes keep their recorded spacing, divided by the playback rate, and are
/// re-stamped with the current time. Playback position survives an
/// unsubscribe, so a paused run resumes where it left off, and is rewound by
/// [`PositionSource::reset`] when a new run starts. A recorded gap longer than
/// the fix timeout is reported as a timeout. The end of the track is reported
/// with [`RunEvent::SourceEnded`].
pub struct ReplaySource {
    track: Arc<RecordedTrack>,
    rate: f64,
    /// Index of the next fix. Held while a fix is handed out so an
    /// unsubscribe never interleaves with it.
    cursor: Arc<Mutex<usize>>,
    next_id: u64,
    running: HashMap<SubscriptionId, Arc<AtomicBool>>,
}

fn lock(cursor: &Mutex<usize>) -> MutexGuard<'_, usize> {
    cursor.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ReplaySource {
    pub fn new(track: RecordedTrack, rate: f64) -> Self {
        let rate = if rate.is_finite() && rate > 0.0 {
            rate
        } else {
            warn!("ignoring playback rate {rate}, using 1.0");
            1.0
        };
        Self {
            track: Arc::new(track),
            rate,
            cursor: Arc::new(Mutex::new(0)),
            next_id: 0,
            running: HashMap::new(),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Index of the next fix to be played.
    pub fn cursor(&self) -> usize {
        *lock(&self.cursor)
    }

    pub fn rewind(&mut self) {
        *lock(&self.cursor) = 0;
    }
}

impl PositionSource for ReplaySource {
    fn is_available(&self) -> bool {
        true
    }

    fn current_position(&mut self, _options: &FixOptions) -> Result<PositionSample, SensorError> {
        let last = self.track.samples.len().saturating_sub(1);
        let index = self.cursor().min(last);
        self.track
            .samples
            .get(index)
            .map(|s| PositionSample::new(s.point, s.speed_mps, Utc::now()))
            .ok_or(SensorError::Timeout(Duration::ZERO))
    }

    fn subscribe(
        &mut self,
        sink: SharedSink,
        options: &FixOptions,
    ) -> Result<SubscriptionId, SensorError> {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let live = Arc::new(AtomicBool::new(true));
        self.running.insert(id, live.clone());

        let playback = Playback {
            track: self.track.clone(),
            cursor: self.cursor.clone(),
            rate: self.rate,
            timeout: options.timeout,
            live,
            sink,
            id,
        };
        thread::spawn(move || playback.run());

        debug!("replay subscription {id:?} starting at fix {}", self.cursor());
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        if let Some(live) = self.running.remove(&id) {
            let _cursor = lock(&self.cursor);
            live.store(false, Ordering::Release);
        }
    }

    fn reset(&mut self) {
        self.rewind();
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        let _cursor = lock(&self.cursor);
        for (_, live) in self.running.drain() {
            live.store(false, Ordering::Release);
        }
    }
}

struct Playback {
    track: Arc<RecordedTrack>,
    cursor: Arc<Mutex<usize>>,
    rate: f64,
    timeout: Duration,
    live: Arc<AtomicBool>,
    sink: SharedSink,
    id: SubscriptionId,
}

impl Playback {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn run(self) {
        let samples = &self.track.samples;
        loop {
            let index = *lock(&self.cursor);
            let Some(sample) = samples.get(index) else {
                let _cursor = lock(&self.cursor);
                if self.is_live() {
                    info!("replay of '{}' finished", self.track.name);
                    self.sink.emit(RunEvent::SourceEnded {
                        subscription: self.id,
                    });
                }
                return;
            };

            let gap = match index.checked_sub(1).and_then(|i| samples.get(i)) {
                Some(prev) => (sample.timestamp - prev.timestamp)
                    .to_std()
                    .unwrap_or_default(),
                None => Duration::ZERO,
            };

            if gap > self.timeout {
                if sleep_while_live(&self.live, self.timeout.div_f64(self.rate)) {
                    let _cursor = lock(&self.cursor);
                    if self.is_live() {
                        self.sink.emit(RunEvent::SensorFailed {
                            subscription: self.id,
                            error: SensorError::Timeout(self.timeout),
                        });
                    }
                }
                return;
            }

            if !sleep_while_live(&self.live, gap.div_f64(self.rate)) {
                return;
            }

            // Advance and deliver as one step, and only while still live and
            // nobody moved the cursor in the meantime.
            let mut cursor = lock(&self.cursor);
            if !self.is_live() || *cursor != index {
                return;
            }
            *cursor = index + 1;
            let fix = PositionSample::new(sample.point, sample.speed_mps, Utc::now());
            let delivered = self.sink.emit(RunEvent::Position {
                subscription: self.id,
                sample: fix,
            });
            drop(cursor);
            if !delivered {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use chrono::TimeZone;
    use std::sync::mpsc;

    fn track(offsets: &[i64]) -> RecordedTrack {
        let start = Utc.with_ymd_and_hms(2024, 5, 14, 6, 30, 0).unwrap();
        RecordedTrack {
            name: "test".to_string(),
            samples: offsets
                .iter()
                .enumerate()
                .map(|(i, secs)| {
                    PositionSample::new(
                        GeoPoint::new(51.5 + i as f64 * 0.0001, -0.12),
                        Some(3.0),
                        start + chrono::Duration::seconds(*secs),
                    )
                })
                .collect(),
        }
    }

    fn channel_sink() -> (SharedSink, mpsc::Receiver<RunEvent>) {
        let (tx, rx) = mpsc::channel::<RunEvent>();
        let sink: SharedSink = Arc::new(tx);
        (sink, rx)
    }

    fn recv(rx: &mpsc::Receiver<RunEvent>) -> RunEvent {
        rx.recv_timeout(Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_replays_every_fix_in_order() {
        let mut source = ReplaySource::new(track(&[0, 1, 2]), 100.0);
        let (sink, rx) = channel_sink();
        let id = source.subscribe(sink, &FixOptions::default()).unwrap();

        for i in 0..3 {
            match recv(&rx) {
                RunEvent::Position {
                    subscription,
                    sample,
                } => {
                    assert_eq!(subscription, id);
                    assert_eq!(sample.point.latitude, 51.5 + i as f64 * 0.0001);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(source.cursor(), 3);
    }

    #[test]
    fn test_long_gap_is_a_timeout() {
        let mut source = ReplaySource::new(track(&[0, 30]), 1000.0);
        let (sink, rx) = channel_sink();
        let id = source.subscribe(sink, &FixOptions::default()).unwrap();

        assert!(matches!(recv(&rx), RunEvent::Position { .. }));
        assert_eq!(
            recv(&rx),
            RunEvent::SensorFailed {
                subscription: id,
                error: SensorError::Timeout(Duration::from_secs(20)),
            }
        );
    }

    #[test]
    fn test_resubscribe_continues_where_it_stopped() {
        let options = FixOptions {
            timeout: Duration::from_secs(120),
            ..FixOptions::default()
        };
        let mut source = ReplaySource::new(track(&[0, 1, 60, 61]), 10.0);
        let (sink, rx) = channel_sink();

        let first = source.subscribe(sink.clone(), &options).unwrap();
        recv(&rx);
        recv(&rx);
        source.unsubscribe(first);
        assert_eq!(source.cursor(), 2);

        thread::sleep(Duration::from_millis(60));
        assert!(rx.try_recv().is_err());

        let position = source.current_position(&options).unwrap();
        assert_eq!(position.point, source.track.samples[2].point);

        source.rewind();
        let second = source.subscribe(sink, &options).unwrap();
        assert_ne!(first, second);
        match recv(&rx) {
            RunEvent::Position { subscription, sample } => {
                assert_eq!(subscription, second);
                assert_eq!(sample.point, source.track.samples[0].point);
            }
            other => panic!("unexpected event {other:?}"),
        }
        source.unsubscribe(second);
    }

    #[test]
    fn test_invalid_rate_falls_back_to_realtime() {
        assert_eq!(ReplaySource::new(track(&[0]), 0.0).rate(), 1.0);
        assert_eq!(ReplaySource::new(track(&[0]), f64::NAN).rate(), 1.0);
        assert_eq!(ReplaySource::new(track(&[0]), 4.0).rate(), 4.0);
    }

    fn expect_fix(rx: &mpsc::Receiver<RunEvent>, id: SubscriptionId, point: GeoPoint) {
        match recv(rx) {
            RunEvent::Position {
                subscription,
                sample,
            } => {
                assert_eq!(subscription, id);
                assert_eq!(sample.point, point);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_end_of_track_is_reported() {
        let mut source = ReplaySource::new(track(&[0, 1]), 100.0);
        let (sink, rx) = channel_sink();
        let id = source.subscribe(sink, &FixOptions::default()).unwrap();

        recv(&rx);
        recv(&rx);
        assert_eq!(recv(&rx), RunEvent::SourceEnded { subscription: id });
        assert_eq!(source.cursor(), 2);
    }

    #[test]
    fn test_new_run_after_full_playback_starts_over() {
        let mut source = ReplaySource::new(track(&[0, 1, 2]), 100.0);
        let (sink, rx) = channel_sink();

        let first = source.subscribe(sink.clone(), &FixOptions::default()).unwrap();
        for _ in 0..3 {
            recv(&rx);
        }
        assert_eq!(recv(&rx), RunEvent::SourceEnded { subscription: first });
        source.unsubscribe(first);

        source.reset();
        assert_eq!(source.cursor(), 0);
        let second = source.subscribe(sink, &FixOptions::default()).unwrap();
        for sample in &source.track.samples {
            expect_fix(&rx, second, sample.point);
        }
        assert_eq!(recv(&rx), RunEvent::SourceEnded { subscription: second });
    }

    #[test]
    fn test_new_run_after_timeout_starts_over() {
        let mut source = ReplaySource::new(track(&[0, 30]), 1000.0);
        let (sink, rx) = channel_sink();

        let first = source.subscribe(sink.clone(), &FixOptions::default()).unwrap();
        recv(&rx);
        assert!(matches!(recv(&rx), RunEvent::SensorFailed { .. }));
        source.unsubscribe(first);

        source.reset();
        let second = source.subscribe(sink, &FixOptions::default()).unwrap();
        expect_fix(&rx, second, source.track.samples[0].point);
        source.unsubscribe(second);
    }

    #[test]
    fn test_released_playback_never_takes_a_fix() {
        let mut source = ReplaySource::new(track(&[0, 1, 2, 3]), 20.0);
        let (sink, rx) = channel_sink();

        let first = source.subscribe(sink.clone(), &FixOptions::default()).unwrap();
        expect_fix(&rx, first, source.track.samples[0].point);
        source.unsubscribe(first);

        // The old thread was mid-sleep; it must neither advance nor emit.
        thread::sleep(Duration::from_millis(150));
        assert_eq!(source.cursor(), 1);
        assert!(rx.try_recv().is_err());

        let second = source.subscribe(sink, &FixOptions::default()).unwrap();
        for sample in &source.track.samples[1..] {
            expect_fix(&rx, second, sample.point);
        }
        assert_eq!(recv(&rx), RunEvent::SourceEnded { subscription: second });
    }
}
