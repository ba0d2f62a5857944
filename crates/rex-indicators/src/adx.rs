use rex_schemas::Bar;

use crate::{require_period, IndicatorError, Series};

/// Average Directional Index via Wilder-smoothed directional movement.
///
/// Follows the classic construction: true range, +DM, -DM smoothed with
/// Wilder's running-sum method, then DX = 100 * |+DI - -DI| / (+DI + -DI),
/// and ADX as the Wilder-smoothed average of DX.
pub fn adx(bars: &[Bar], period: usize) -> Result<Series, IndicatorError> {
    require_period(period)?;

    let mut out = vec![None; bars.len()];
    if bars.len() <= 2 * period {
        return Ok(out);
    }

    let mut tr = Vec::with_capacity(bars.len() - 1);
    let mut plus_dm = Vec::with_capacity(bars.len() - 1);
    let mut minus_dm = Vec::with_capacity(bars.len() - 1);

    for w in bars.windows(2) {
        let (prev, cur) = (&w[0], &w[1]);
        let hl = cur.high - cur.low;
        let hc = (cur.high - prev.close).abs();
        let lc = (cur.low - prev.close).abs();
        tr.push(hl.max(hc).max(lc));

        let up_move = cur.high - prev.high;
        let down_move = prev.low - cur.low;
        if up_move > down_move && up_move > 0.0 {
            plus_dm.push(up_move);
        } else {
            plus_dm.push(0.0);
        }
        if down_move > up_move && down_move > 0.0 {
            minus_dm.push(down_move);
        } else {
            minus_dm.push(0.0);
        }
    }

    let mut smooth_tr: f64 = tr[..period].iter().sum();
    let mut smooth_plus: f64 = plus_dm[..period].iter().sum();
    let mut smooth_minus: f64 = minus_dm[..period].iter().sum();

    let mut dx_series = Vec::with_capacity(tr.len());
    dx_series.push(dx_from_smoothed(smooth_plus, smooth_minus, smooth_tr));

    for i in period..tr.len() {
        smooth_tr = smooth_tr - (smooth_tr / period as f64) + tr[i];
        smooth_plus = smooth_plus - (smooth_plus / period as f64) + plus_dm[i];
        smooth_minus = smooth_minus - (smooth_minus / period as f64) + minus_dm[i];
        dx_series.push(dx_from_smoothed(smooth_plus, smooth_minus, smooth_tr));
    }

    // dx_series[0] corresponds to bar index `period` (first window using
    // `windows(2)` offset by one, then `period` Wilder-summed deltas).
    let first_dx_bar = period;
    let mut avg_dx: f64 = dx_series[..period].iter().sum::<f64>() / period as f64;
    out[first_dx_bar + period - 1] = Some(avg_dx);

    for i in period..dx_series.len() {
        avg_dx = (avg_dx * (period as f64 - 1.0) + dx_series[i]) / period as f64;
        out[first_dx_bar + i] = Some(avg_dx);
    }

    Ok(out)
}

fn dx_from_smoothed(smooth_plus: f64, smooth_minus: f64, smooth_tr: f64) -> f64 {
    if smooth_tr == 0.0 {
        return 0.0;
    }
    let plus_di = 100.0 * smooth_plus / smooth_tr;
    let minus_di = 100.0 * smooth_minus / smooth_tr;
    let sum = plus_di + minus_di;
    if sum == 0.0 {
        0.0
    } else {
        100.0 * (plus_di - minus_di).abs() / sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bar_ohlc;

    #[test]
    fn strong_uptrend_yields_high_adx() {
        let bars: Vec<Bar> = (0..80)
            .map(|i| {
                let base = 10.0 + i as f64;
                bar_ohlc(base, base + 1.0, base - 0.2, base + 0.8)
            })
            .collect();
        let out = adx(&bars, 14).unwrap();
        let last = out.last().copied().flatten().unwrap();
        assert!(last > 40.0, "expected strong trend adx, got {last}");
    }

    #[test]
    fn insufficient_bars_all_none() {
        let bars: Vec<Bar> = (0..10).map(|_| bar_ohlc(1.0, 1.1, 0.9, 1.0)).collect();
        let out = adx(&bars, 14).unwrap();
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn adx_bounded_0_to_100() {
        let bars: Vec<Bar> = (0..80)
            .map(|i| {
                let base = 10.0 + (i as f64 * 0.3).sin() * 4.0;
                bar_ohlc(base, base + 1.0, base - 1.0, base + 0.2)
            })
            .collect();
        let out = adx(&bars, 14).unwrap();
        for v in out.into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v));
        }
    }
}
