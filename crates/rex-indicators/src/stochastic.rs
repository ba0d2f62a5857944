use rex_schemas::Bar;

use crate::sma::sma;
use crate::{require_period, IndicatorError, Series};

#[derive(Clone, Debug, PartialEq)]
pub struct Stochastic {
    pub k: Series,
    pub d: Series,
}

/// Stochastic oscillator: `%K` from the rolling highest-high/lowest-low over
/// `k_period`, optionally smoothed by `smooth_k`, then `%D` as an SMA of `%K`
/// over `d_period`.
pub fn stochastic(
    bars: &[Bar],
    k_period: usize,
    d_period: usize,
    smooth_k: usize,
) -> Result<Stochastic, IndicatorError> {
    require_period(k_period)?;
    require_period(d_period)?;
    require_period(smooth_k)?;

    let mut raw_k = vec![None; bars.len()];
    if bars.len() >= k_period {
        for i in (k_period - 1)..bars.len() {
            let window = &bars[(i + 1 - k_period)..=i];
            let hh = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let ll = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            let range = hh - ll;
            let value = if range == 0.0 {
                50.0
            } else {
                (bars[i].close - ll) / range * 100.0
            };
            raw_k[i] = Some(value);
        }
    }

    let k = if smooth_k <= 1 {
        raw_k
    } else {
        smooth_series(&raw_k, smooth_k)?
    };

    let d = smooth_series(&k, d_period)?;

    Ok(Stochastic { k, d })
}

/// SMA over a `Series` that may start with `None` entries, preserving the
/// leading gap instead of treating it as a zero.
fn smooth_series(series: &Series, period: usize) -> Result<Series, IndicatorError> {
    let first_defined = match series.iter().position(Option::is_some) {
        Some(i) => i,
        None => return Ok(vec![None; series.len()]),
    };
    let defined: Vec<f64> = series[first_defined..]
        .iter()
        .map(|v| v.expect("sliced from first defined index"))
        .collect();
    let smoothed = sma(&defined, period)?;
    let mut out = vec![None; first_defined];
    out.extend(smoothed);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bar_ohlc;

    #[test]
    fn close_at_high_of_range_is_100() {
        let mut bars: Vec<Bar> = (0..10).map(|_| bar_ohlc(5.0, 10.0, 0.0, 5.0)).collect();
        bars.push(bar_ohlc(5.0, 10.0, 0.0, 10.0));
        let out = stochastic(&bars, 5, 3, 1).unwrap();
        assert_eq!(out.k[bars.len() - 1], Some(100.0));
    }

    #[test]
    fn values_bounded_0_to_100() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| {
                let base = 10.0 + (i as f64 * 0.2).sin() * 3.0;
                bar_ohlc(base, base + 1.0, base - 1.0, base + 0.3)
            })
            .collect();
        let out = stochastic(&bars, 14, 3, 3).unwrap();
        for v in out.k.into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v));
        }
        for v in out.d.into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v));
        }
    }
}
