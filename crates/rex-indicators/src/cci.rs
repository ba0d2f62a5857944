use rex_schemas::Bar;

use crate::{require_period, IndicatorError, Series};

/// Commodity Channel Index: `(typical_price - sma(typical_price)) / (0.015 *
/// mean_absolute_deviation)`.
pub fn cci(bars: &[Bar], period: usize) -> Result<Series, IndicatorError> {
    require_period(period)?;

    let mut out = vec![None; bars.len()];
    if bars.len() < period {
        return Ok(out);
    }

    let typical: Vec<f64> = bars.iter().map(|b| (b.high + b.low + b.close) / 3.0).collect();

    for i in (period - 1)..typical.len() {
        let window = &typical[(i + 1 - period)..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let mean_dev = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / period as f64;
        out[i] = if mean_dev == 0.0 {
            Some(0.0)
        } else {
            Some((typical[i] - mean) / (0.015 * mean_dev))
        };
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bar_ohlc;

    #[test]
    fn flat_prices_yield_zero_cci() {
        let bars: Vec<Bar> = (0..10).map(|_| bar_ohlc(10.0, 10.0, 10.0, 10.0)).collect();
        let out = cci(&bars, 5).unwrap();
        for v in out.into_iter().skip(4) {
            assert_eq!(v, Some(0.0));
        }
    }

    #[test]
    fn insufficient_bars_all_none() {
        let bars: Vec<Bar> = (0..3).map(|_| bar_ohlc(1.0, 1.1, 0.9, 1.0)).collect();
        let out = cci(&bars, 5).unwrap();
        assert!(out.iter().all(Option::is_none));
    }
}
