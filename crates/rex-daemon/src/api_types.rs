//! Request and response types for the rex-daemon HTTP surface (spec §6).
//!
//! These types are `Serialize`/`Deserialize` only — no business logic.

use rex_broker::{AccountInfo, PositionSnapshot};
use rex_schemas::{StrategyConfig, Timeframe};
use rex_strategy::RuntimeStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_sec: u64,
    pub broker_connected: bool,
    pub platform_connected: bool,
    pub active_runtimes: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySummary {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub status: RuntimeStatus,
    pub trade_count: u32,
    pub pnl: f64,
}

impl From<rex_strategy::RuntimeSnapshot> for StrategySummary {
    fn from(s: rex_strategy::RuntimeSnapshot) -> Self {
        Self {
            id: s.id,
            name: s.name,
            symbol: s.symbol,
            timeframe: s.timeframe,
            status: s.status,
            trade_count: s.trade_count,
            pnl: s.pnl_today.to_f64(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchDeleteRequest(pub Vec<String>);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub strategy_deleted: bool,
    pub trade_logs_deleted: u64,
    pub was_running: bool,
}

impl From<rex_runtime::DeleteOutcome> for DeleteResponse {
    fn from(o: rex_runtime::DeleteOutcome) -> Self {
        Self {
            strategy_deleted: o.strategy_deleted,
            trade_logs_deleted: o.trade_logs_deleted,
            was_running: o.was_running,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteResult {
    pub id: String,
    #[serde(flatten)]
    pub outcome: Option<DeleteResponse>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeHistoryQuery {
    pub strategy_id: Option<String>,
}

pub type AccountResponse = AccountInfo;
pub type OpenTradesResponse = Vec<PositionSnapshot>;
pub type AvailableStrategiesResponse = Vec<StrategyConfig>;
