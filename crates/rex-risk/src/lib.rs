//! rex-risk — RiskGate (spec §4.4)
//!
//! Separates concerns from FilterStack: sizing and portfolio capacity, not
//! market conditions. `sizing` is pure arithmetic; `gate::evaluate` is the
//! stateful, sticky-halt circuit breaker, grounded on the same
//! sanity-clamp-then-evaluate shape as the execution engine's risk checks.

mod gate;
mod sizing;
mod types;

pub use gate::evaluate;
pub use sizing::{atr_sizing, fixed_fractional, Lots};
pub use types::{
    CurrencyOverlap, OpenPositionSummary, ReasonCode, RiskDecision, RiskInput, RiskState,
};
