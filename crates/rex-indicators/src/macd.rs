use crate::ema::ema;
use crate::{IndicatorError, Series};

#[derive(Clone, Debug, PartialEq)]
pub struct Macd {
    pub macd_line: Series,
    pub signal_line: Series,
    pub histogram: Series,
}

/// MACD: `ema(fast) - ema(slow)`, with a `signal`-period EMA of the MACD
/// line, and the histogram as their difference.
pub fn macd(
    values: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Result<Macd, IndicatorError> {
    let fast = ema(values, fast_period)?;
    let slow = ema(values, slow_period)?;

    let macd_line: Series = fast
        .iter()
        .zip(slow.iter())
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    // EMA of the MACD line only over its defined (non-None) suffix, so the
    // signal line's warm-up doesn't double-count the slow EMA's own warm-up.
    let first_defined = macd_line.iter().position(Option::is_some);
    let signal_line = match first_defined {
        Some(start) => {
            let defined: Vec<f64> = macd_line[start..]
                .iter()
                .map(|v| v.expect("sliced from first defined index"))
                .collect();
            let sig = ema(&defined, signal_period)?;
            let mut full = vec![None; start];
            full.extend(sig);
            full
        }
        None => vec![None; macd_line.len()],
    };

    let histogram: Series = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        })
        .collect();

    Ok(Macd {
        macd_line,
        signal_line,
        histogram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_is_macd_minus_signal_where_both_defined() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let out = macd(&values, 12, 26, 9).unwrap();
        for i in 0..values.len() {
            if let (Some(m), Some(s), Some(h)) =
                (out.macd_line[i], out.signal_line[i], out.histogram[i])
            {
                assert!((h - (m - s)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn deterministic_repeat() {
        let values: Vec<f64> = (0..40).map(|i| i as f64 * 1.1).collect();
        let a = macd(&values, 12, 26, 9).unwrap();
        let b = macd(&values, 12, 26, 9).unwrap();
        assert_eq!(a, b);
    }
}
