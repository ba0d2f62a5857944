use rex_schemas::Bar;

use crate::{IndicatorError, Series};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SarParams {
    pub step: f64,
    pub max: f64,
}

impl Default for SarParams {
    fn default() -> Self {
        Self {
            step: 0.02,
            max: 0.2,
        }
    }
}

/// Parabolic SAR. Stateful, sequential by construction (each point depends
/// on the previous trend direction and extreme point), so this cannot be
/// windowed like the other indicators.
pub fn sar(bars: &[Bar], params: SarParams) -> Result<Series, IndicatorError> {
    if params.step <= 0.0 || params.max <= 0.0 {
        return Err(IndicatorError::InvalidPeriod { period: 0 });
    }

    let mut out = vec![None; bars.len()];
    if bars.len() < 2 {
        return Ok(out);
    }

    let mut rising = bars[1].close >= bars[0].close;
    let mut accel = params.step;
    let mut extreme = if rising { bars[0].high } else { bars[0].low };
    let mut current = if rising { bars[0].low } else { bars[0].high };

    out[0] = Some(current);

    for i in 1..bars.len() {
        let mut next = current + accel * (extreme - current);

        if rising {
            next = next.min(bars[i - 1].low);
            if i >= 2 {
                next = next.min(bars[i - 2].low);
            }
        } else {
            next = next.max(bars[i - 1].high);
            if i >= 2 {
                next = next.max(bars[i - 2].high);
            }
        }

        let reversed = if rising {
            bars[i].low < next
        } else {
            bars[i].high > next
        };

        if reversed {
            next = extreme;
            rising = !rising;
            accel = params.step;
            extreme = if rising { bars[i].high } else { bars[i].low };
        } else {
            if rising && bars[i].high > extreme {
                extreme = bars[i].high;
                accel = (accel + params.step).min(params.max);
            } else if !rising && bars[i].low < extreme {
                extreme = bars[i].low;
                accel = (accel + params.step).min(params.max);
            }
        }

        out[i] = Some(next);
        current = next;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bar_ohlc;

    #[test]
    fn uptrend_keeps_sar_below_price() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| {
                let base = 10.0 + i as f64 * 0.5;
                bar_ohlc(base, base + 0.6, base - 0.2, base + 0.4)
            })
            .collect();
        let out = sar(&bars, SarParams::default()).unwrap();
        for (i, v) in out.iter().enumerate().skip(5) {
            assert!(v.unwrap() <= bars[i].low + 1e-6);
        }
    }

    #[test]
    fn too_few_bars_yields_none() {
        let bars = vec![bar_ohlc(1.0, 1.1, 0.9, 1.0)];
        let out = sar(&bars, SarParams::default()).unwrap();
        assert_eq!(out, vec![None]);
    }

    #[test]
    fn invalid_step_is_rejected() {
        let bars: Vec<Bar> = (0..3).map(|_| bar_ohlc(1.0, 1.1, 0.9, 1.0)).collect();
        assert!(sar(
            &bars,
            SarParams {
                step: 0.0,
                max: 0.2
            }
        )
        .is_err());
    }
}
