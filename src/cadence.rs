use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::sensor::{RunEvent, SharedSink};

/// Period of the elapsed-time counter while a run is being tracked.
pub const CADENCE_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// Fixed-interval timer feeding `RunEvent::Tick` into a sink.
pub trait Cadence {
    fn arm(&mut self, sink: SharedSink) -> TimerHandle;
    /// Stop a timer. Safe to call on an already disarmed handle.
    fn disarm(&mut self, handle: TimerHandle);
}

impl<T: Cadence + ?Sized> Cadence for Box<T> {
    fn arm(&mut self, sink: SharedSink) -> TimerHandle {
        (**self).arm(sink)
    }

    fn disarm(&mut self, handle: TimerHandle) {
        (**self).disarm(handle)
    }
}

/// Wall-clock cadence backed by one sleeping thread per armed timer.
#[derive(Debug)]
pub struct ThreadCadence {
    period: Duration,
    next_id: u64,
    running: HashMap<TimerHandle, Arc<AtomicBool>>,
}

impl ThreadCadence {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_id: 0,
            running: HashMap::new(),
        }
    }
}

impl Default for ThreadCadence {
    fn default() -> Self {
        Self::new(CADENCE_PERIOD)
    }
}

impl Cadence for ThreadCadence {
    fn arm(&mut self, sink: SharedSink) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let live = Arc::new(AtomicBool::new(true));
        self.running.insert(handle, live.clone());

        let period = self.period;
        thread::spawn(move || loop {
            thread::sleep(period);
            if !live.load(Ordering::Acquire) {
                break;
            }
            if !sink.emit(RunEvent::Tick { timer: handle }) {
                break;
            }
        });

        handle
    }

    fn disarm(&mut self, handle: TimerHandle) {
        if let Some(live) = self.running.remove(&handle) {
            live.store(false, Ordering::Release);
        }
    }
}

impl Drop for ThreadCadence {
    fn drop(&mut self) {
        for (_, live) in self.running.drain() {
            live.store(false, Ordering::Release);
        }
    }
}

#[derive(Default)]
struct ManualInner {
    next_id: u64,
    armed: Option<(TimerHandle, SharedSink)>,
    arm_calls: usize,
    disarmed: Vec<TimerHandle>,
}

/// Virtual-time cadence. Time only moves when [`ManualCadence::advance`] is
/// called, one tick per virtual second, and only while a timer is armed.
#[derive(Clone, Default)]
pub struct ManualCadence {
    inner: Arc<Mutex<ManualInner>>,
}

impl ManualCadence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `secs` virtual seconds pass. Returns how many ticks were delivered.
    pub fn advance(&self, secs: u64) -> u64 {
        let inner = self.lock();
        let Some((handle, sink)) = &inner.armed else {
            return 0;
        };
        let mut fired = 0;
        for _ in 0..secs {
            if !sink.emit(RunEvent::Tick { timer: *handle }) {
                break;
            }
            fired += 1;
        }
        fired
    }

    pub fn armed(&self) -> Option<TimerHandle> {
        self.lock().armed.as_ref().map(|(h, _)| *h)
    }

    pub fn arm_calls(&self) -> usize {
        self.lock().arm_calls
    }

    pub fn disarmed(&self) -> Vec<TimerHandle> {
        self.lock().disarmed.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Cadence for ManualCadence {
    fn arm(&mut self, sink: SharedSink) -> TimerHandle {
        let mut inner = self.lock();
        inner.next_id += 1;
        inner.arm_calls += 1;
        let handle = TimerHandle(inner.next_id);
        inner.armed = Some((handle, sink));
        handle
    }

    fn disarm(&mut self, handle: TimerHandle) {
        let mut inner = self.lock();
        if matches!(inner.armed, Some((armed, _)) if armed == handle) {
            inner.armed = None;
        }
        if !inner.disarmed.contains(&handle) {
            inner.disarmed.push(handle);
        }
    }
}
