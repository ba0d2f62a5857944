//! Outbound circuit breaker: a two-state gate built as a pure, deterministic
//! function of (state, now) deciding whether a call is permitted, extended
//! with a timer for `Open -> HalfOpen`.

use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through; failures accumulate toward `failure_threshold`.
    Closed,
    /// Calls are blocked until `open_duration` has elapsed since opening.
    Open,
    /// One probe call is allowed through; success closes the circuit,
    /// failure reopens it.
    HalfOpen,
}

/// Result of polling the breaker before attempting a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallDecision {
    Permitted,
    Blocked,
}

impl CallDecision {
    pub fn is_permitted(&self) -> bool {
        matches!(self, CallDecision::Permitted)
    }

    pub fn is_blocked(&self) -> bool {
        !self.is_permitted()
    }
}

/// `Closed -> Open -> HalfOpen -> {Closed, Open}` breaker over consecutive
/// outbound-call failures (spec §4.9: "after N consecutive failures open
/// the circuit for T seconds").
#[derive(Debug)]
pub struct CircuitBreaker {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<DateTime<Utc>>,
    failure_threshold: u32,
    open_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, open_duration: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            failure_threshold,
            open_duration,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Call before attempting an outbound request. Transitions `Open` to
    /// `HalfOpen` once `open_duration` has elapsed, then reports whether
    /// the call may proceed.
    pub fn poll(&mut self, now: DateTime<Utc>) -> CallDecision {
        if self.state == CircuitState::Open {
            if let Some(opened_at) = self.opened_at {
                if now - opened_at >= self.open_duration {
                    self.state = CircuitState::HalfOpen;
                }
            }
        }
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => CallDecision::Permitted,
            CircuitState::Open => CallDecision::Blocked,
        }
    }

    /// Record a successful call: closes the circuit and resets the
    /// failure count.
    pub fn record_success(&mut self) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
    }

    /// Record a failed call. A failure while `HalfOpen` reopens
    /// immediately; a failure while `Closed` opens once
    /// `failure_threshold` consecutive failures accumulate.
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        if self.state == CircuitState::HalfOpen {
            self.state = CircuitState::Open;
            self.opened_at = Some(now);
            return;
        }
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.failure_threshold {
            self.state = CircuitState::Open;
            self.opened_at = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let now = Utc::now();
        let mut cb = CircuitBreaker::new(3, Duration::seconds(30));
        for _ in 0..2 {
            cb.record_failure(now);
            assert_eq!(cb.poll(now), CallDecision::Permitted);
        }
        cb.record_failure(now);
        assert_eq!(cb.poll(now), CallDecision::Blocked);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn half_opens_after_open_duration_elapses() {
        let opened_at = Utc::now();
        let mut cb = CircuitBreaker::new(1, Duration::seconds(30));
        cb.record_failure(opened_at);
        assert_eq!(cb.poll(opened_at), CallDecision::Blocked);

        let later = opened_at + Duration::seconds(31);
        assert_eq!(cb.poll(later), CallDecision::Permitted);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_failure_reopens_the_circuit() {
        let opened_at = Utc::now();
        let mut cb = CircuitBreaker::new(1, Duration::seconds(30));
        cb.record_failure(opened_at);
        let probe_at = opened_at + Duration::seconds(31);
        cb.poll(probe_at);
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_failure(probe_at);
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.poll(probe_at), CallDecision::Blocked);
    }

    #[test]
    fn success_closes_the_circuit() {
        let now = Utc::now();
        let mut cb = CircuitBreaker::new(1, Duration::seconds(30));
        cb.record_failure(now);
        let probe_at = now + Duration::seconds(31);
        cb.poll(probe_at);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.poll(probe_at), CallDecision::Permitted);
    }
}
