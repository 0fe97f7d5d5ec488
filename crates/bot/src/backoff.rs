use std::time::Duration;

use tokio::time::Instant;

/// Exponential reconnect delay: `initial`, `initial * factor`, ... capped at `max`.
///
/// The delay never shrinks while connections keep failing. It returns to
/// `initial` when the caller calls [`reset`](Self::reset) (the supervisor does
/// on the server's welcome), or when a connection stays up for at least
/// `stable_after` even without one.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    factor: f64,
    stable_after: Duration,
    current: Duration,
    connected_at: Option<Instant>,
    attempts: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            factor: factor.max(1.0),
            stable_after: Duration::from_secs(30),
            current: initial,
            connected_at: None,
            attempts: 0,
        }
    }

    /// Minimum connection lifetime that resets the delay. Zero resets on every connect.
    pub fn with_stable_after(mut self, stable_after: Duration) -> Self {
        self.stable_after = stable_after;
        self
    }

    /// Delay to wait before the next attempt; advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.attempts = self.attempts.saturating_add(1);
        self.current = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.factor)
            .unwrap_or(self.max)
            .min(self.max);
        delay
    }

    /// Delay the next call to [`next_delay`](Self::next_delay) will return.
    pub fn peek(&self) -> Duration {
        self.current
    }

    /// Record that a connection was established at `at`.
    pub fn connected(&mut self, at: Instant) {
        self.connected_at = Some(at);
    }

    /// Record that the connection was lost at `at`. Returns `true` when the
    /// connection had been stable and the delay was reset.
    pub fn disconnected(&mut self, at: Instant) -> bool {
        let Some(since) = self.connected_at.take() else {
            return false;
        };
        if at.saturating_duration_since(since) >= self.stable_after {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Back to the initial delay.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.attempts = 0;
    }

    /// Attempts since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
