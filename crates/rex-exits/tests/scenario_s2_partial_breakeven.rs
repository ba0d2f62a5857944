use chrono::Utc;

use rex_exits::{evaluate, ExitContext, PositionRecord};
use rex_schemas::{
    BreakevenSpec, ExitSpec, PartialLevel, Side, SmartExitSpec, StopLossKind, StopLossSpec,
    TakeProfitSpec, TrailingSpec,
};

fn ctx(price: f64) -> ExitContext {
    ExitContext {
        price,
        now: Utc::now(),
        atr: None,
        current_regime: None,
        unfavorable_regimes: vec![],
        regime_confidence: 0.0,
        session_close_now: false,
    }
}

/// spec §8 S2: partial exit with breakeven.
#[test]
fn partial_exit_with_breakeven_matches_scenario() {
    let mut position = PositionRecord::new(
        "T-S2",
        "EURUSD",
        Side::Buy,
        1.1000,
        Utc::now(),
        0.10,
        Some(1.0980),
        None,
        0.0020,
    );

    let spec = ExitSpec {
        stop_loss: Some(StopLossSpec {
            kind: StopLossKind::Pips { value: 20.0 },
            min_pips: None,
            max_pips: None,
            max_holding_minutes: None,
        }),
        take_profit: Some(TakeProfitSpec::Partial {
            rr_ratio: 2.0,
            levels: vec![
                PartialLevel {
                    percentage: 50.0,
                    at_rr: 1.0,
                    move_stop_to_breakeven: true,
                },
                PartialLevel {
                    percentage: 50.0,
                    at_rr: 2.0,
                    move_stop_to_breakeven: false,
                },
            ],
        }),
        trailing: Some(TrailingSpec {
            enabled: false,
            activate_at_rr: None,
            distance: rex_schemas::TrailingDistance::Pips(0.0),
            step_pips: None,
        }),
        smart_exit: SmartExitSpec {
            breakeven: Some(BreakevenSpec {
                trigger_ratio: 1.0,
                buffer_pips: 0.0,
            }),
            ..Default::default()
        },
    };

    // Price reaches 1.1020: RR = (1.1020 - 1.1000) / 0.0020 = 1.0.
    let first = evaluate(&mut position, &spec, &ctx(1.1020));
    assert_eq!(first.partial_closes.len(), 1);
    assert_eq!(first.partial_closes[0].fraction, 0.5);
    assert!((position.volume_remaining - 0.05).abs() < 1e-9);
    assert_eq!(first.modify_stop, Some(1.1000));
    assert!(position.breakeven_moved);

    // Price reaches 1.1040: RR = 2.0, second level fires and exhausts volume.
    let second = evaluate(&mut position, &spec, &ctx(1.1040));
    assert_eq!(second.partial_closes.len(), 1);
    assert_eq!(second.partial_closes[0].fraction, 0.5);
    assert!(position.volume_remaining.abs() < 1e-9);
}
