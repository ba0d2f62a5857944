use chrono::{DateTime, Utc};
use rex_broker::{AccountInfo, PositionSnapshot};
use serde::{Deserialize, Serialize};

/// Published on the heartbeat loop (spec §4.7, §4.9).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatSnapshot {
    pub executor_id: String,
    pub account_summary: AccountInfo,
    pub runtime_count: usize,
    pub open_positions: Vec<PositionSnapshot>,
    pub time: DateTime<Utc>,
}

/// Outcome of an outbound `PlatformLink` call (spec §4.9, §7
/// `PlatformUnavailable`).
#[derive(Clone, Debug, PartialEq)]
pub enum PlatformError {
    /// The circuit was open, or retries were exhausted; the event was
    /// accepted into the bounded outbox and will be retried when the
    /// circuit closes.
    Queued,
    /// The platform rejected the request outright (bad payload, auth) —
    /// retrying would not help.
    Rejected(String),
    /// The outbox itself is full; the event was dropped.
    Dropped(String),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "platform unavailable, event queued for retry"),
            Self::Rejected(msg) => write!(f, "platform rejected request: {msg}"),
            Self::Dropped(msg) => write!(f, "platform event dropped: {msg}"),
        }
    }
}

impl std::error::Error for PlatformError {}
