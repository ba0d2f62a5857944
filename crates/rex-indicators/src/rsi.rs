use crate::{require_period, IndicatorError, Series};

/// Relative Strength Index using Wilder smoothing (spec §4.1).
///
/// The first `period` bars produce no value (there is no prior-bar delta
/// for index 0, and the Wilder average needs `period` deltas to seed).
pub fn rsi(values: &[f64], period: usize) -> Result<Series, IndicatorError> {
    require_period(period)?;

    let mut out = vec![None; values.len()];
    if values.len() <= period {
        return Ok(out);
    }

    let deltas: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain: f64 =
        deltas[..period].iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
    let mut avg_loss: f64 =
        deltas[..period].iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;

    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in period..deltas.len() {
        let gain = deltas[i].max(0.0);
        let loss = (-deltas[i]).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        out[i + 1] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    Ok(out)
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_gains_saturates_at_100() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let out = rsi(&values, 14).unwrap();
        assert_eq!(out[14], Some(100.0));
    }

    #[test]
    fn bounded_between_0_and_100() {
        let values = vec![
            10.0, 10.5, 10.2, 10.8, 10.3, 10.9, 10.1, 10.6, 10.4, 10.7, 10.2, 10.5, 10.3, 10.6,
            10.9, 10.1,
        ];
        let out = rsi(&values, 14).unwrap();
        for v in out.into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v));
        }
    }
}
