//! rex-indicators — IndicatorKit (spec §4.1)
//!
//! Pure, deterministic functions computing technical indicators from OHLCV
//! windows. Every function returns a sequence the same length as the input
//! with leading `None` entries for the warm-up period. No I/O, no time
//! source, no randomness: two calls on the same input always produce
//! bitwise-identical output (spec §8 property 6).

mod adx;
mod atr;
mod bollinger;
mod cci;
mod ema;
mod macd;
mod obv;
mod rsi;
mod sar;
mod sma;
mod stochastic;

pub use adx::adx;
pub use atr::atr;
pub use bollinger::{bollinger, BollingerBands};
pub use cci::cci;
pub use ema::ema;
pub use macd::{macd, Macd};
pub use obv::obv;
pub use rsi::rsi;
pub use sar::{sar, SarParams};
pub use sma::sma;
pub use stochastic::{stochastic, Stochastic};

use rex_schemas::Bar;

/// A single indicator output series: one value per input bar, `None`
/// during warm-up.
pub type Series = Vec<Option<f64>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorError {
    /// `period` must be >= 1 (or >= 2 where a derivative/spread is required).
    InvalidPeriod { period: i64 },
    /// Fewer bars were supplied than the indicator needs to emit even its
    /// first value.
    InsufficientData { required: usize, got: usize },
}

impl std::fmt::Display for IndicatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPeriod { period } => write!(f, "invalid period: {period}"),
            Self::InsufficientData { required, got } => {
                write!(f, "insufficient data: need {required} bars, got {got}")
            }
        }
    }
}

impl std::error::Error for IndicatorError {}

pub(crate) fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

pub(crate) fn require_period(period: usize) -> Result<(), IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod {
            period: period as i64,
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub(crate) fn bar(close: f64) -> Bar {
        bar_ohlc(close, close, close, close)
    }

    pub(crate) fn bar_ohlc(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(
            Utc.timestamp_opt(0, 0).unwrap(),
            open,
            high,
            low,
            close,
            1.0,
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::bar;
    use super::*;

    #[test]
    fn closes_extracts_close_column() {
        let bars = vec![bar(1.0), bar(2.0), bar(3.0)];
        assert_eq!(closes(&bars), vec![1.0, 2.0, 3.0]);
    }
}
