use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CorrelationGrouping {
    ByCurrency,
    Pairwise,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSpec {
    pub enabled: bool,
    pub max_pair: f64,
    pub grouping: CorrelationGrouping,
    #[serde(default = "CorrelationSpec::default_lookback")]
    pub lookback_period: u32,
}

impl CorrelationSpec {
    fn default_lookback() -> u32 {
        50
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_pair: 1.0,
            grouping: CorrelationGrouping::Pairwise,
            lookback_period: Self::default_lookback(),
        }
    }
}

/// `{riskPercentPerTrade, maxPositions, maxPositionsPerSymbol, maxDailyLossCcy,
/// maxDailyTrades, maxDrawdownPct, maxConsecutiveLosses, correlation}` — spec §3.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskSpec {
    pub risk_percent_per_trade: f64,
    pub max_positions: u32,
    pub max_positions_per_symbol: u32,
    pub max_daily_loss_ccy: f64,
    pub max_daily_trades: u32,
    pub max_drawdown_pct: f64,
    pub max_consecutive_losses: u32,
    pub correlation: CorrelationSpec,
}
