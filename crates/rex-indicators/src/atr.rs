use rex_schemas::Bar;

use crate::{require_period, IndicatorError, Series};

/// Average True Range using Wilder smoothing (spec §4.1, GLOSSARY).
pub fn atr(bars: &[Bar], period: usize) -> Result<Series, IndicatorError> {
    require_period(period)?;

    let mut out = vec![None; bars.len()];
    if bars.len() <= period {
        return Ok(out);
    }

    let true_ranges = true_range_series(bars);

    let mut avg_tr: f64 = true_ranges[..period].iter().sum::<f64>() / period as f64;
    out[period] = Some(avg_tr);

    for i in period..true_ranges.len() {
        avg_tr = (avg_tr * (period as f64 - 1.0) + true_ranges[i]) / period as f64;
        out[i + 1] = Some(avg_tr);
    }

    Ok(out)
}

/// True range per bar, starting at index 1 (index 0 has no prior close).
fn true_range_series(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            let hl = cur.high - cur.low;
            let hc = (cur.high - prev.close).abs();
            let lc = (cur.low - prev.close).abs();
            hl.max(hc).max(lc)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bar_ohlc;

    #[test]
    fn constant_range_bars_yield_constant_atr() {
        let bars: Vec<Bar> = (0..20)
            .map(|_| bar_ohlc(10.0, 11.0, 9.0, 10.0))
            .collect();
        let out = atr(&bars, 14).unwrap();
        let v = out[14].unwrap();
        assert!((v - 2.0).abs() < 1e-9);
        assert!((out[15].unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn insufficient_bars_all_none() {
        let bars: Vec<Bar> = (0..5).map(|_| bar_ohlc(1.0, 1.0, 1.0, 1.0)).collect();
        let out = atr(&bars, 14).unwrap();
        assert!(out.iter().all(Option::is_none));
    }
}
