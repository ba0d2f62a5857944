use std::collections::HashSet;

use chrono::{DateTime, Utc};

use rex_conditions::Regime;
use rex_schemas::Side;

/// Position lifecycle states (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionState {
    Open,
    PartiallyClosed,
    Closing,
    Closed,
}

impl PositionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PositionState::Closed)
    }
}

/// Events that drive `PositionRecord`'s lifecycle transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    /// A partial close executed (spec §4.5 responsibility 2).
    Partial,
    /// A full-close broker call was issued.
    CloseRequest,
    /// Broker confirmed the close.
    CloseConfirm,
}

/// Returned for an illegal lifecycle transition. Callers MUST treat this as
/// an escalation signal (spec §4.5: a stuck/desynced position needs manual
/// reconciliation, never a silent retry of the same bad transition).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: PositionState,
    pub event: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal position transition: {:?} + {}", self.from, self.event)
    }
}

impl std::error::Error for TransitionError {}

#[derive(Debug, Clone, PartialEq)]
pub struct PartialExecution {
    pub level_id: String,
    pub fraction: f64,
    pub price: f64,
    pub time: DateTime<Utc>,
}

/// A single open (or lifecycle-in-progress) position, owned exclusively by
/// the `StrategyRuntime`'s `ExitManager` that opened it (spec §3, §4.5).
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    pub ticket: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub volume_original: f64,
    pub volume_remaining: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub peak_favorable_price: f64,
    pub realized_partials: Vec<PartialExecution>,
    pub breakeven_moved: bool,
    pub trailing_active: bool,
    /// Price-unit distance from entry to the initial stop, needed to express
    /// current RR (spec §4.5 "currentRR"). Not itself a spec-listed field of
    /// `PositionRecord` but required to compute one.
    pub initial_stop_distance: f64,
    /// Regime read at entry time, if a detector was available. `None`
    /// means the regime-change exit never fires for this position (spec
    /// §4.5 responsibility 5 needs a baseline to call a later reading
    /// "unfavorable" against).
    pub entry_regime: Option<Regime>,

    pub state: PositionState,
    pub closing_since: Option<DateTime<Utc>>,
    applied: HashSet<String>,
}

impl PositionRecord {
    pub fn new(
        ticket: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        entry_price: f64,
        entry_time: DateTime<Utc>,
        volume: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
        initial_stop_distance: f64,
    ) -> Self {
        Self {
            ticket: ticket.into(),
            symbol: symbol.into(),
            side,
            entry_price,
            entry_time,
            volume_original: volume,
            volume_remaining: volume,
            stop_loss,
            take_profit,
            peak_favorable_price: entry_price,
            realized_partials: Vec::new(),
            breakeven_moved: false,
            trailing_active: false,
            initial_stop_distance,
            entry_regime: None,
            state: PositionState::Open,
            closing_since: None,
            applied: HashSet::new(),
        }
    }

    /// Current reward-to-risk multiple given `price`, signed by side.
    pub fn current_rr(&self, price: f64) -> f64 {
        if self.initial_stop_distance <= 0.0 {
            return 0.0;
        }
        self.side.sign() * (price - self.entry_price) / self.initial_stop_distance
    }

    pub fn apply(&mut self, event: PositionEvent, event_id: Option<&str>) -> Result<(), TransitionError> {
        if let Some(id) = event_id {
            if self.applied.contains(id) {
                return Ok(());
            }
        }
        self.do_transition(&event)?;
        if let Some(id) = event_id {
            self.applied.insert(id.to_string());
        }
        Ok(())
    }

    fn do_transition(&mut self, event: &PositionEvent) -> Result<(), TransitionError> {
        use PositionEvent::*;
        use PositionState::*;

        match (self.state, event) {
            (Open, Partial) => self.state = PartiallyClosed,
            (PartiallyClosed, Partial) => {}
            (Open | PartiallyClosed, CloseRequest) => self.state = Closing,
            (Closing, CloseConfirm) => {
                self.state = Closed;
                self.closing_since = None;
            }
            (state, ev) => {
                return Err(TransitionError {
                    from: state,
                    event: format!("{ev:?}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PositionRecord {
        PositionRecord::new(
            "T1",
            "EURUSD",
            Side::Buy,
            1.1000,
            Utc::now(),
            1.0,
            Some(1.0975),
            Some(1.1040),
            0.0025,
        )
    }

    #[test]
    fn first_partial_moves_to_partially_closed() {
        let mut p = record();
        p.apply(PositionEvent::Partial, Some("e1")).unwrap();
        assert_eq!(p.state, PositionState::PartiallyClosed);
    }

    #[test]
    fn close_request_then_confirm() {
        let mut p = record();
        p.apply(PositionEvent::CloseRequest, Some("e1")).unwrap();
        assert_eq!(p.state, PositionState::Closing);
        p.apply(PositionEvent::CloseConfirm, Some("e2")).unwrap();
        assert_eq!(p.state, PositionState::Closed);
    }

    #[test]
    fn confirm_on_open_is_illegal() {
        let mut p = record();
        let err = p.apply(PositionEvent::CloseConfirm, Some("e1")).unwrap_err();
        assert_eq!(err.from, PositionState::Open);
    }

    #[test]
    fn replay_is_idempotent() {
        let mut p = record();
        p.apply(PositionEvent::CloseRequest, Some("e1")).unwrap();
        p.apply(PositionEvent::CloseRequest, Some("e1")).unwrap();
        assert_eq!(p.state, PositionState::Closing);
    }

    #[test]
    fn current_rr_reflects_side() {
        let p = record();
        let rr = p.current_rr(1.1050);
        assert!((rr - 2.0).abs() < 1e-9);
    }
}
