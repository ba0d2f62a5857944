use chrono::NaiveDate;

use rex_portfolio::{DailyCounters, Micros};
use rex_risk::{evaluate, OpenPositionSummary, ReasonCode, RiskDecision, RiskInput, RiskState};
use rex_schemas::{CorrelationSpec, RiskSpec};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn spec() -> RiskSpec {
    RiskSpec {
        risk_percent_per_trade: 1.0,
        max_positions: 5,
        max_positions_per_symbol: 1,
        max_daily_loss_ccy: 200.0,
        max_daily_trades: 0,
        max_drawdown_pct: 0.0,
        max_consecutive_losses: 0,
        correlation: CorrelationSpec::disabled(),
    }
}

fn input_for(daily: rex_portfolio::DailyCounterSnapshot) -> RiskInput {
    RiskInput {
        symbol: "EURUSD".to_string(),
        symbol_currencies: vec!["EUR".to_string(), "USD".to_string()],
        equity: Micros::from_f64(10_000.0),
        balance: Micros::from_f64(10_000.0),
        open_positions: Vec::<OpenPositionSummary>::new(),
        daily,
        max_daily_loss: Micros::from_f64(200.0),
    }
}

/// spec §8 S3: maxDailyLossCcy=200, two losing exits of -120 then -90; the
/// third entry attempt is blocked once the cumulative loss crosses 200.
#[test]
fn third_entry_blocked_once_cumulative_loss_crosses_limit() {
    let mut counters = DailyCounters::new();
    let mut state = RiskState::new();
    let risk_spec = spec();

    counters.record_trade("strat-1", today(), Micros::from_f64(-120.0));
    let daily = counters.snapshot_for_day("strat-1", today());
    assert_eq!(daily.realized_loss.to_f64(), 120.0);
    let decision = evaluate(&risk_spec, &mut state, &input_for(daily));
    assert_eq!(decision, RiskDecision::Allow);

    counters.record_trade("strat-1", today(), Micros::from_f64(-90.0));
    let daily = counters.snapshot_for_day("strat-1", today());
    assert_eq!(daily.realized_loss.to_f64(), 210.0);
    let decision = evaluate(&risk_spec, &mut state, &input_for(daily));
    assert_eq!(decision, RiskDecision::Block(ReasonCode::MaxDailyLossBreached));
    assert!(state.halted, "breaching max daily loss must halt the gate");
}
