use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Strategy evaluation timeframe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
    #[serde(rename = "MN")]
    Mn,
}

impl Timeframe {
    /// Nominal bar length in seconds. `Mn` uses a 30-day approximation,
    /// which is only used for poll-cadence scheduling, never for indicator math.
    pub fn seconds(self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 5 * 60,
            Timeframe::M15 => 15 * 60,
            Timeframe::M30 => 30 * 60,
            Timeframe::H1 => 60 * 60,
            Timeframe::H4 => 4 * 60 * 60,
            Timeframe::D1 => 24 * 60 * 60,
            Timeframe::W1 => 7 * 24 * 60 * 60,
            Timeframe::Mn => 30 * 24 * 60 * 60,
        }
    }
}

/// One OHLCV bar.
///
/// `is_closed` distinguishes a fully-formed bar from the currently-forming
/// one a broker terminal may return as the last element of a bars query
/// (see `BrokerClient::bars`, spec §4.8).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub is_closed: bool,
}

impl Bar {
    pub fn new(
        open_time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        is_closed: bool,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            is_closed,
        }
    }

    /// `true` if every OHLCV field is finite (no NaN/inf from a bad feed).
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }
}
