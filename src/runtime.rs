use std::ops::ControlFlow;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};
use tracing::debug;

/// Everything the practice loop reacts to
#[derive(Clone, Debug)]
pub enum PracticeEvent {
    Key(KeyEvent),
    Resize,
    /// No input arrived within one tick; time to refresh the elapsed display
    Tick,
}

pub trait PracticeEventSource: Send + 'static {
    /// Waits up to `timeout` for the next event.
    fn recv_timeout(&self, timeout: Duration) -> Result<PracticeEvent, RecvTimeoutError>;
}

/// Reads terminal events on a background thread
pub struct TerminalEventSource {
    rx: Receiver<PracticeEvent>,
}

impl TerminalEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // key release events would double every keystroke on some platforms
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    tx.send(PracticeEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(PracticeEvent::Resize),
                Ok(_) => Ok(()),
                Err(e) => {
                    debug!(error = %e, "terminal event reader stopped");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for TerminalEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PracticeEventSource for TerminalEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PracticeEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Event source fed from a channel, for tests and scripted input
pub struct TestEventSource {
    rx: Receiver<PracticeEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<PracticeEvent>) -> Self {
        Self { rx }
    }
}

impl PracticeEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PracticeEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms.max(1)))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Serializes input and ticks into a single stream of events
pub struct Runner<E: PracticeEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: PracticeEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to one tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> PracticeEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                PracticeEvent::Tick
            }
        }
    }

    /// Feeds events to `handler` until it breaks or `max_steps` events were handled.
    ///
    /// Returns the handler's break value, if any.
    pub fn run<B, F>(&self, max_steps: Option<usize>, mut handler: F) -> Option<B>
    where
        F: FnMut(PracticeEvent) -> ControlFlow<B>,
    {
        let mut steps = 0usize;
        loop {
            if max_steps.is_some_and(|max| steps >= max) {
                return None;
            }
            steps += 1;
            if let ControlFlow::Break(value) = handler(self.step()) {
                return Some(value);
            }
        }
    }
}
