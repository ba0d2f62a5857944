use std::collections::BTreeMap;

use rex_portfolio::{DailyCounterSnapshot, Micros};

/// One currently open position's footprint, enough for portfolio-capacity
/// gates (spec §4.4).
#[derive(Clone, Debug, PartialEq)]
pub struct OpenPositionSummary {
    pub symbol: String,
    /// ISO currency codes touched by this symbol, e.g. `["EUR", "USD"]`
    /// for EURUSD — used by the `byCurrency` correlation grouping.
    pub currencies: Vec<String>,
}

/// Everything `evaluate` needs for one entry-candidate's portfolio gates.
#[derive(Clone, Debug, PartialEq)]
pub struct RiskInput {
    pub symbol: String,
    pub symbol_currencies: Vec<String>,
    pub equity: Micros,
    pub balance: Micros,
    pub open_positions: Vec<OpenPositionSummary>,
    pub daily: DailyCounterSnapshot,
    pub max_daily_loss: Micros,
}

/// Sticky per-strategy state RiskGate carries between evaluations (spec
/// §4.4: consecutive-loss halt persists until explicitly reset).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RiskState {
    pub consecutive_losses: u32,
    pub halted: bool,
}

impl RiskState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one closed trade's win/loss outcome. A loss increments the
    /// streak; a win resets it. Caller checks `consecutive_losses` against
    /// `RiskSpec::max_consecutive_losses` on the next `evaluate` call.
    pub fn record_trade_result(&mut self, won: bool) {
        if won {
            self.consecutive_losses = 0;
        } else {
            self.consecutive_losses += 1;
        }
    }

    /// Clears the sticky halt (e.g. at day rollover or manual resume).
    pub fn reset_halt(&mut self) {
        self.halted = false;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RiskDecision {
    Allow,
    Block(ReasonCode),
}

impl RiskDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, RiskDecision::Allow)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReasonCode {
    AlreadyHalted,
    MaxPositionsReached,
    MaxPositionsPerSymbolReached,
    MaxDailyLossBreached,
    MaxDailyTradesReached,
    MaxDrawdownBreached,
    MaxConsecutiveLossesReached,
    CorrelationExceeded { other_symbol: String, correlation: f64 },
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyHalted => write!(f, "risk gate is halted"),
            Self::MaxPositionsReached => write!(f, "max open positions reached"),
            Self::MaxPositionsPerSymbolReached => write!(f, "max positions per symbol reached"),
            Self::MaxDailyLossBreached => write!(f, "max daily loss breached"),
            Self::MaxDailyTradesReached => write!(f, "max daily trades reached"),
            Self::MaxDrawdownBreached => write!(f, "max drawdown breached"),
            Self::MaxConsecutiveLossesReached => write!(f, "max consecutive losses reached"),
            Self::CorrelationExceeded {
                other_symbol,
                correlation,
            } => write!(
                f,
                "correlation {correlation:.2} with {other_symbol} exceeds limit"
            ),
        }
    }
}

impl std::error::Error for ReasonCode {}

pub type CurrencyOverlap = BTreeMap<String, Vec<String>>;
