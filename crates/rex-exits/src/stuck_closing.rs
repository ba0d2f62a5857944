use chrono::{DateTime, Utc};

use crate::position::{PositionRecord, PositionState};

/// What to do about a position stuck in `Closing` past the grace window
/// (spec §4.5: a close confirmation that never arrives needs an escalation
/// path, not an infinite silent wait).
#[derive(Clone, Debug, PartialEq)]
pub enum StuckClosingAction {
    /// Still within the grace window; nothing to do yet.
    Wait,
    /// Grace window elapsed once; re-issue the close request.
    Retry,
    /// Already retried once and it's still stuck; hand off to an operator.
    Escalate,
}

const GRACE_SECONDS: i64 = 30;

/// Tracks whether a stuck position has already had its one retry, so the
/// second timeout escalates instead of retrying forever.
#[derive(Clone, Debug, Default)]
pub struct StuckClosingPolicy {
    retried: bool,
}

impl StuckClosingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, position: &PositionRecord, now: DateTime<Utc>) -> StuckClosingAction {
        if position.state != PositionState::Closing {
            self.retried = false;
            return StuckClosingAction::Wait;
        }

        let Some(since) = position.closing_since else {
            return StuckClosingAction::Wait;
        };

        if (now - since).num_seconds() < GRACE_SECONDS {
            return StuckClosingAction::Wait;
        }

        if self.retried {
            StuckClosingAction::Escalate
        } else {
            self.retried = true;
            StuckClosingAction::Retry
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rex_schemas::Side;

    fn stuck_position(since: DateTime<Utc>) -> PositionRecord {
        let mut p = PositionRecord::new(
            "T1",
            "EURUSD",
            Side::Buy,
            1.1000,
            Utc::now(),
            1.0,
            Some(1.0975),
            Some(1.1040),
            0.0025,
        );
        p.apply(crate::position::PositionEvent::CloseRequest, Some("req1"))
            .unwrap();
        p.closing_since = Some(since);
        p
    }

    #[test]
    fn waits_inside_grace_window() {
        let mut policy = StuckClosingPolicy::new();
        let p = stuck_position(Utc::now());
        assert_eq!(policy.check(&p, Utc::now()), StuckClosingAction::Wait);
    }

    #[test]
    fn retries_once_then_escalates() {
        let mut policy = StuckClosingPolicy::new();
        let p = stuck_position(Utc::now() - Duration::seconds(31));
        assert_eq!(policy.check(&p, Utc::now()), StuckClosingAction::Retry);
        assert_eq!(policy.check(&p, Utc::now()), StuckClosingAction::Escalate);
    }
}
