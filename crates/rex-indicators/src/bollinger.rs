use crate::sma::sma;
use crate::{require_period, IndicatorError, Series};

#[derive(Clone, Debug, PartialEq)]
pub struct BollingerBands {
    pub middle: Series,
    pub upper: Series,
    pub lower: Series,
}

/// Bollinger Bands: SMA middle band, +/- `std_dev_mult` population standard
/// deviations over the same window.
pub fn bollinger(
    values: &[f64],
    period: usize,
    std_dev_mult: f64,
) -> Result<BollingerBands, IndicatorError> {
    require_period(period)?;

    let middle = sma(values, period)?;
    let mut upper = vec![None; values.len()];
    let mut lower = vec![None; values.len()];

    if values.len() >= period {
        for i in (period - 1)..values.len() {
            let mean = middle[i].expect("sma defined once warm-up window is filled");
            let window = &values[(i + 1 - period)..=i];
            let variance =
                window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
            let sd = variance.sqrt();
            upper[i] = Some(mean + std_dev_mult * sd);
            lower[i] = Some(mean - std_dev_mult * sd);
        }
    }

    Ok(BollingerBands {
        middle,
        upper,
        lower,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_series_has_zero_width_bands() {
        let values = vec![5.0; 10];
        let out = bollinger(&values, 5, 2.0).unwrap();
        for i in 4..10 {
            assert!((out.upper[i].unwrap() - out.middle[i].unwrap()).abs() < 1e-12);
            assert!((out.lower[i].unwrap() - out.middle[i].unwrap()).abs() < 1e-12);
        }
    }

    #[test]
    fn upper_always_above_lower_when_defined() {
        let values = vec![1.0, 3.0, 2.0, 5.0, 4.0, 6.0, 2.0, 8.0];
        let out = bollinger(&values, 4, 2.0).unwrap();
        for i in 0..values.len() {
            if let (Some(u), Some(l)) = (out.upper[i], out.lower[i]) {
                assert!(u >= l);
            }
        }
    }
}
