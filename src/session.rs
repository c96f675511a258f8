use crate::classify::{classify, CharStatus, Classification};
use crate::clock::{time_between, Clock, SystemClock};
use crate::metrics::{compute, Metrics};
use std::time::{Duration, SystemTime};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum SessionState {
    Idle,
    Active,
    Finished,
}

/// Read-only projection of a session for rendering
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub state: SessionState,
    pub statuses: Vec<CharStatus>,
    pub is_valid_prefix: bool,
    pub elapsed: Duration,
    pub metrics: Option<Metrics>,
}

/// Result of feeding one input snapshot to a session
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub snapshot: Snapshot,
    /// True only for the call that moved the session to `Finished`
    pub finished_now: bool,
}

/// A single practice attempt against one reference text
#[derive(Debug)]
pub struct Session<C: Clock = SystemClock> {
    text: String,
    reference: Vec<char>,
    input: Vec<char>,
    state: SessionState,
    classification: Classification,
    started_at: Option<SystemTime>,
    finished_at: Option<SystemTime>,
    metrics: Option<Metrics>,
    clock: C,
}

impl Session<SystemClock> {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_clock(text, SystemClock)
    }
}

impl<C: Clock> Session<C> {
    pub fn with_clock(text: impl Into<String>, clock: C) -> Self {
        let text = text.into();
        let reference: Vec<char> = text.chars().collect();
        let classification = classify(&reference, &[]);
        Self {
            text,
            reference,
            input: Vec::new(),
            state: SessionState::Idle,
            classification,
            started_at: None,
            finished_at: None,
            metrics: None,
            clock,
        }
    }

    /// Replaces the input buffer with `new_input` and advances the lifecycle.
    ///
    /// Once finished, further calls leave the session untouched.
    pub fn submit_input(&mut self, new_input: &str) -> Submission {
        if self.state == SessionState::Finished {
            return Submission {
                snapshot: self.snapshot(),
                finished_now: false,
            };
        }

        // one reading per call, so a start and finish in the same call share a timestamp
        let now = self.clock.now();
        self.input = new_input.chars().collect();

        if self.state == SessionState::Idle && (!self.input.is_empty() || self.reference.is_empty())
        {
            self.started_at = Some(now);
            self.state = SessionState::Active;
            debug!(chars = self.reference.len(), "session started");
        }

        self.classification = classify(&self.reference, &self.input);

        let mut finished_now = false;
        if self.state == SessionState::Active && self.input.len() >= self.reference.len() {
            self.finish(now);
            finished_now = true;
        }

        Submission {
            snapshot: self.snapshot(),
            finished_now,
        }
    }

    fn finish(&mut self, finished_at: SystemTime) {
        let started_at = self.started_at.unwrap_or(finished_at);
        let elapsed = time_between(started_at, finished_at);

        let metrics = compute(&self.reference, &self.input, elapsed);
        debug!(
            speed = metrics.speed,
            accuracy = metrics.accuracy,
            errors = metrics.error_count,
            "session finished"
        );

        self.finished_at = Some(finished_at);
        self.metrics = Some(metrics);
        self.state = SessionState::Finished;
    }

    pub fn elapsed(&self) -> Duration {
        match (self.state, self.started_at, self.finished_at) {
            (SessionState::Active, Some(start), _) => time_between(start, self.clock.now()),
            (SessionState::Finished, Some(start), Some(end)) => time_between(start, end),
            _ => Duration::ZERO,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            statuses: self.classification.statuses.clone(),
            is_valid_prefix: self.classification.is_valid_prefix,
            elapsed: self.elapsed(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn has_started(&self) -> bool {
        self.state != SessionState::Idle
    }

    pub fn has_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn input_text(&self) -> String {
        self.input.iter().collect()
    }

    pub fn statuses(&self) -> &[CharStatus] {
        &self.classification.statuses
    }

    pub fn is_valid_prefix(&self) -> bool {
        self.classification.is_valid_prefix
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<SystemTime> {
        self.finished_at
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }
}
