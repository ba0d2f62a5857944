use rex_portfolio::Micros;
use rex_risk::fixed_fractional;

/// spec §8 S1: entry sizing plus the TP payoff check.
#[test]
fn entry_volume_and_tp_payoff_match_scenario() {
    let lots = fixed_fractional(Micros::from_f64(10_000.0), 0.5, 25.0, 1.0, 0.01, 0.01, 100.0);
    assert!((lots.0 - 0.02).abs() < 1e-9);

    let pip_value = 1.0;
    let take_profit_pips = 40.0;
    let pnl = lots.0 * take_profit_pips * pip_value;
    assert!((pnl - 0.8).abs() < 1e-9);
}
