use chrono::{DateTime, Utc};
use rex_schemas::Side;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub free_margin: f64,
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub point_size: f64,
    pub tick_value: f64,
    pub volume_min: f64,
    pub volume_max: f64,
    pub volume_step: f64,
    pub spread_pips: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub bid: f64,
    pub ask: f64,
    pub time: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpenPositionRequest {
    pub symbol: String,
    pub side: Side,
    pub volume: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub comment: String,
    pub magic: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpenPositionResponse {
    pub ticket: String,
    pub filled_price: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyPositionRequest {
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClosePositionResponse {
    pub closed_volume: f64,
    pub close_price: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub ticket: String,
    pub symbol: String,
    pub side: Side,
    pub volume: f64,
    pub open_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub magic: i64,
}

/// Failure taxonomy (spec §4.8): `Retryable` gets exponential backoff up to
/// a max then escalates; `Rejected` never retries; `Fatal` pauses the owning
/// runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum BrokerError {
    Retryable(String),
    Rejected(String),
    Fatal(String),
}

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retryable(msg) => write!(f, "broker retryable error: {msg}"),
            Self::Rejected(msg) => write!(f, "broker rejected: {msg}"),
            Self::Fatal(msg) => write!(f, "broker fatal error: {msg}"),
        }
    }
}

impl std::error::Error for BrokerError {}
