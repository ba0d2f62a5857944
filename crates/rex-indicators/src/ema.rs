use crate::sma::sma;
use crate::{require_period, IndicatorError, Series};

/// Exponential moving average, seeded from the SMA of the first `period`
/// values (spec §4.1: "EMA seeded from SMA of the first N bars").
pub fn ema(values: &[f64], period: usize) -> Result<Series, IndicatorError> {
    require_period(period)?;

    let mut out = vec![None; values.len()];
    if values.len() < period {
        return Ok(out);
    }

    let seed = sma(values, period)?;
    let seed_idx = period - 1;
    let mut prev = seed[seed_idx].expect("sma warm-up already checked len >= period");
    out[seed_idx] = Some(prev);

    let alpha = 2.0 / (period as f64 + 1.0);
    for i in (seed_idx + 1)..values.len() {
        let value = (values[i] - prev) * alpha + prev;
        out[i] = Some(value);
        prev = value;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_from_sma_then_smooths() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = ema(&values, 3).unwrap();
        // seed = sma([1,2,3]) = 2.0
        assert_eq!(out[2], Some(2.0));
        let alpha = 2.0 / 4.0;
        let e3 = (4.0 - 2.0) * alpha + 2.0;
        assert!((out[3].unwrap() - e3).abs() < 1e-12);
    }

    #[test]
    fn deterministic_repeat_evaluation() {
        let values = vec![10.0, 11.0, 9.0, 12.0, 13.0, 14.5, 15.0];
        let a = ema(&values, 4).unwrap();
        let b = ema(&values, 4).unwrap();
        assert_eq!(a, b);
    }
}
