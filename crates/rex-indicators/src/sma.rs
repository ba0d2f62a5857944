use crate::{require_period, IndicatorError, Series};

/// Simple moving average over `period` closes. The first `period - 1`
/// entries are `None`.
pub fn sma(values: &[f64], period: usize) -> Result<Series, IndicatorError> {
    require_period(period)?;

    let mut out = vec![None; values.len()];
    if values.len() < period {
        return Ok(out);
    }

    let mut window_sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(window_sum / period as f64);

    for i in period..values.len() {
        window_sum += values[i] - values[i - period];
        out[i] = Some(window_sum / period as f64);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warms_up_then_tracks_window_average() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let out = sma(&values, 3).unwrap();
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn insufficient_data_is_all_none() {
        let out = sma(&[1.0, 2.0], 5).unwrap();
        assert_eq!(out, vec![None, None]);
    }

    #[test]
    fn zero_period_is_invalid() {
        assert_eq!(
            sma(&[1.0], 0).unwrap_err(),
            IndicatorError::InvalidPeriod { period: 0 }
        );
    }
}
