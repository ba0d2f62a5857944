use std::collections::HashMap;

use chrono::{DateTime, Utc};

use rex_schemas::NewsImpact;

/// Everything the FilterStack needs to evaluate one entry candidate. Built
/// fresh per candidate by `StrategyRuntime`; filters never reach out for
/// their own market data.
#[derive(Clone, Debug)]
pub struct FilterContext {
    pub now: DateTime<Utc>,
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub point_size: f64,
    pub current_atr_pips: f64,
    /// Log-returns of the candidate symbol over the correlation lookback.
    pub candidate_log_returns: Vec<f64>,
    /// Log-returns of every currently open symbol, for CorrelationFilter.
    pub open_symbol_log_returns: HashMap<String, Vec<f64>>,
}

/// Upcoming calendar events, consulted by NewsFilter. Out of core scope to
/// source (spec §4.3) — implementations inject a concrete calendar.
pub trait NewsCalendar: Send + Sync {
    fn events_near(&self, symbol: &str, now: DateTime<Utc>) -> Vec<NewsEvent>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewsEvent {
    pub symbol: String,
    pub time: DateTime<Utc>,
    pub impact: NewsImpact,
}

/// Inert default: no calendar source configured (spec §9 open question —
/// ship with no news blocking until a real calendar is wired in).
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNewsCalendar;

impl NewsCalendar for NullNewsCalendar {
    fn events_near(&self, _symbol: &str, _now: DateTime<Utc>) -> Vec<NewsEvent> {
        Vec::new()
    }
}
