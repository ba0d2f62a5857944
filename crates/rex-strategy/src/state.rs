use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rex_conditions::IndicatorCache;
use rex_exits::{PositionRecord, StuckClosingPolicy};
use rex_portfolio::Micros;
use rex_risk::RiskState;
use rex_schemas::{Bar, StrategyConfig};

/// Per-running-strategy status (spec §3 RuntimeState).
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeStatus {
    Starting,
    Running,
    Paused,
    Stopping,
    Stopped,
    Errored,
}

impl RuntimeStatus {
    /// Spec §4.6/§7 invariant: no new entry opens while not `running`.
    pub fn may_open_new_entries(self) -> bool {
        matches!(self, RuntimeStatus::Running)
    }
}

/// Point-in-time view published for `ExecutorCore`'s `/api/strategies`
/// listing (spec §6) — the only part of `RuntimeState` visible outside the
/// owning task.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeSnapshot {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub timeframe: rex_schemas::Timeframe,
    pub status: RuntimeStatus,
    pub trade_count: u32,
    pub pnl_today: Micros,
}

impl From<&RuntimeState> for RuntimeSnapshot {
    fn from(state: &RuntimeState) -> Self {
        Self {
            id: state.config.id.clone(),
            name: state.config.name.clone(),
            symbol: state.config.symbol.clone(),
            timeframe: state.config.timeframe,
            status: state.status,
            trade_count: state.stats.trades,
            pnl_today: state.stats.pnl_today,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeStats {
    pub trades: u32,
    pub pnl_today: Micros,
    pub consecutive_losses: u32,
}

impl Default for RuntimeStats {
    fn default() -> Self {
        Self {
            trades: 0,
            pnl_today: Micros::ZERO,
            consecutive_losses: 0,
        }
    }
}

/// Mutable state owned exclusively by one `StrategyRuntime` (spec §3).
pub struct RuntimeState {
    pub config: StrategyConfig,
    pub status: RuntimeStatus,
    pub last_bar: Option<Bar>,
    pub bars: Vec<Bar>,
    pub indicator_cache: IndicatorCache,
    pub open_positions: HashMap<String, PositionRecord>,
    pub stuck_closing: HashMap<String, StuckClosingPolicy>,
    pub stats: RuntimeStats,
    pub risk_state: RiskState,
    pub next_poll_due: DateTime<Utc>,
}

impl RuntimeState {
    pub fn new(config: StrategyConfig, now: DateTime<Utc>) -> Self {
        Self {
            config,
            status: RuntimeStatus::Starting,
            last_bar: None,
            bars: Vec::new(),
            indicator_cache: IndicatorCache::new(0.0001),
            open_positions: HashMap::new(),
            stuck_closing: HashMap::new(),
            stats: RuntimeStats::default(),
            risk_state: RiskState::new(),
            next_poll_due: now,
        }
    }
}
