use rex_portfolio::Micros;

/// Lot size, rounded to a broker's lot step (spec §4.4).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Lots(pub f64);

/// `lots = round((equity * riskPct) / (stopDistancePips * pipValue), step)`,
/// clamped to `[lot_min, lot_max]` (spec §4.4).
pub fn fixed_fractional(
    equity: Micros,
    risk_pct: f64,
    stop_distance_pips: f64,
    pip_value: f64,
    lot_step: f64,
    lot_min: f64,
    lot_max: f64,
) -> Lots {
    if stop_distance_pips <= 0.0 || pip_value <= 0.0 || lot_step <= 0.0 {
        return Lots(0.0);
    }

    let risk_amount = equity.to_f64() * (risk_pct / 100.0);
    let raw_lots = risk_amount / (stop_distance_pips * pip_value);

    let stepped = (raw_lots / lot_step).round() * lot_step;
    Lots(stepped.clamp(lot_min, lot_max))
}

/// ATR-derived stop distance (`atrMultiplier * ATR(period)`, expressed in
/// pips), then fixed-fractional sizing against that distance (spec §4.4).
#[allow(clippy::too_many_arguments)]
pub fn atr_sizing(
    equity: Micros,
    risk_pct: f64,
    atr_pips: f64,
    atr_multiplier: f64,
    pip_value: f64,
    lot_step: f64,
    lot_min: f64,
    lot_max: f64,
) -> Lots {
    let stop_distance_pips = atr_pips * atr_multiplier;
    fixed_fractional(
        equity,
        risk_pct,
        stop_distance_pips,
        pip_value,
        lot_step,
        lot_min,
        lot_max,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_fractional_matches_spec_worked_example() {
        // S1: equity 10000, risk 0.5%, stop 25 pips, pipValue 1, step 0.01.
        let lots = fixed_fractional(Micros::from_f64(10_000.0), 0.5, 25.0, 1.0, 0.01, 0.01, 100.0);
        assert!((lots.0 - 0.02).abs() < 1e-9);
    }

    #[test]
    fn clamps_to_lot_min_and_max() {
        let tiny = fixed_fractional(Micros::from_f64(10.0), 0.5, 25.0, 1.0, 0.01, 0.01, 100.0);
        assert_eq!(tiny.0, 0.01);

        let huge = fixed_fractional(Micros::from_f64(10_000_000.0), 5.0, 1.0, 1.0, 0.01, 0.01, 50.0);
        assert_eq!(huge.0, 50.0);
    }

    #[test]
    fn zero_stop_distance_is_zero_lots() {
        let lots = fixed_fractional(Micros::from_f64(10_000.0), 0.5, 0.0, 1.0, 0.01, 0.01, 100.0);
        assert_eq!(lots.0, 0.0);
    }

    #[test]
    fn atr_sizing_derives_stop_distance_then_sizes() {
        let lots = atr_sizing(Micros::from_f64(10_000.0), 0.5, 12.5, 2.0, 1.0, 0.01, 0.01, 100.0);
        // stop distance = 12.5 * 2.0 = 25 pips, matches the worked example above.
        assert!((lots.0 - 0.02).abs() < 1e-9);
    }
}
