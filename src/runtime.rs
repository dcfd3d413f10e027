use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::sensor::{EventSink, RunEvent, SharedSink};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    /// Redraw tick from the runner, unrelated to the run cadence.
    Tick,
    Run(RunEvent),
}

/// Run events share the terminal event channel, so one loop dispatches both.
impl EventSink for Sender<AppEvent> {
    fn emit(&self, event: RunEvent) -> bool {
        self.send(AppEvent::Run(event)).is_ok()
    }
}

/// Source of app events (keyboard, resize, position fixes, cadence ticks)
pub trait AppEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;

    /// Sink that feeds run events into this source.
    fn run_sink(&self) -> SharedSink;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
    tx: Sender<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let input = tx.clone();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if input.send(AppEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if input.send(AppEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx, tx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AppEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn run_sink(&self) -> SharedSink {
        Arc::new(self.tx.clone())
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-fed event source for tests and headless runs
pub struct ChannelEventSource {
    rx: Receiver<AppEvent>,
    tx: Sender<AppEvent>,
}

impl ChannelEventSource {
    /// Returns the source and a sender for injecting key or resize events.
    pub fn new() -> (Self, Sender<AppEvent>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                rx,
                tx: tx.clone(),
            },
            tx,
        )
    }
}

impl AppEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn run_sink(&self) -> SharedSink {
        Arc::new(self.tx.clone())
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: AppEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: AppEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    pub fn run_sink(&self) -> SharedSink {
        self.event_source.run_sink()
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::TimerHandle;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (es, _tx) = ChannelEventSource::new();
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        // With no events available, step should yield Tick
        let ev = runner.step();
        match ev {
            AppEvent::Tick => {}
            _ => panic!("expected Tick on timeout"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let (es, tx) = ChannelEventSource::new();
        tx.send(AppEvent::Resize).unwrap();
        let ticker = FixedTicker::new(Duration::from_millis(10));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            AppEvent::Resize => {}
            _ => panic!("expected Resize event"),
        }
    }

    #[test]
    fn run_events_arrive_through_the_same_loop() {
        let (es, _tx) = ChannelEventSource::new();
        let runner = Runner::new(es, FixedTicker::new(Duration::from_millis(10)));

        let sink = runner.run_sink();
        assert!(sink.emit(RunEvent::Tick {
            timer: TimerHandle(4)
        }));

        match runner.step() {
            AppEvent::Run(RunEvent::Tick { timer }) => assert_eq!(timer, TimerHandle(4)),
            other => panic!("expected cadence tick, got {other:?}"),
        }
    }
}
