use chrono::{DateTime, Utc};

use rex_conditions::Regime;
use rex_schemas::{ExitSpec, Side, TakeProfitSpec, TrailingDistance};

use crate::decision::{CloseReason, ExitDecision, PartialCloseAction};
use crate::position::{PositionEvent, PositionRecord};

/// Tick-local market context `ExitManager` needs; built fresh by
/// `StrategyRuntime` (spec §4.5).
#[derive(Clone, Debug)]
pub struct ExitContext {
    pub price: f64,
    pub now: DateTime<Utc>,
    pub atr: Option<f64>,
    pub current_regime: Option<Regime>,
    /// Regimes considered unfavorable for this position's entry thesis.
    pub unfavorable_regimes: Vec<Regime>,
    pub regime_confidence: f64,
    pub session_close_now: bool,
}

/// Runs ExitManager for one position on one tick: breakeven → partials →
/// trailing → time/regime/session (spec §4.5). Mutates `position`'s
/// tracked fields (`peak_favorable_price`, `breakeven_moved`,
/// `volume_remaining`, `realized_partials`) and returns the broker actions
/// the caller must still execute.
pub fn evaluate(position: &mut PositionRecord, spec: &ExitSpec, ctx: &ExitContext) -> ExitDecision {
    let mut decision = ExitDecision::default();

    apply_breakeven(position, spec, ctx, &mut decision);
    apply_partials(position, spec, ctx, &mut decision);
    apply_trailing(position, spec, ctx, &mut decision);
    apply_take_profit(position, ctx, &mut decision);
    apply_time_regime_session(position, spec, ctx, &mut decision);

    decision
}

/// Non-partial take-profit kinds (`Pips`/`Percent`/`Rr`) are resolved to a
/// single price at entry time and carried on the position itself
/// (`PositionRecord.take_profit`); partial levels are handled separately by
/// `apply_partials`. Closes the full remaining volume once price trades
/// through it (spec §4.5 responsibility 2 / §8 S1).
fn apply_take_profit(position: &PositionRecord, ctx: &ExitContext, decision: &mut ExitDecision) {
    if decision.full_close.is_some() {
        return;
    }
    let Some(take_profit) = position.take_profit else {
        return;
    };
    let reached = match position.side {
        Side::Buy => ctx.price >= take_profit,
        Side::Sell => ctx.price <= take_profit,
    };
    if reached {
        decision.full_close = Some(CloseReason::TakeProfit);
    }
}

fn apply_breakeven(
    position: &mut PositionRecord,
    spec: &ExitSpec,
    ctx: &ExitContext,
    decision: &mut ExitDecision,
) {
    let Some(breakeven) = &spec.smart_exit.breakeven else {
        return;
    };
    if position.breakeven_moved {
        return;
    }
    if position.current_rr(ctx.price) < breakeven.trigger_ratio {
        return;
    }

    let buffer = breakeven.buffer_pips;
    let candidate = position.entry_price + position.side.sign() * buffer;
    decision.modify_stop = Some(best_stop(position.side, decision.modify_stop, candidate));
    position.breakeven_moved = true;
}

fn apply_partials(
    position: &mut PositionRecord,
    spec: &ExitSpec,
    ctx: &ExitContext,
    decision: &mut ExitDecision,
) {
    let Some(TakeProfitSpec::Partial { levels, .. }) = &spec.take_profit else {
        return;
    };

    let mut sorted_levels = levels.clone();
    sorted_levels.sort_by(|a, b| a.at_rr.partial_cmp(&b.at_rr).unwrap_or(std::cmp::Ordering::Equal));

    let current_rr = position.current_rr(ctx.price);

    for (i, level) in sorted_levels.iter().enumerate() {
        let level_id = format!("level_{i}");
        if position.realized_partials.iter().any(|p| p.level_id == level_id) {
            continue;
        }
        if current_rr < level.at_rr {
            continue;
        }
        if position.volume_remaining <= 0.0 {
            continue;
        }

        let raw_amount = level.percentage / 100.0 * position.volume_original;
        let amount = raw_amount.min(position.volume_remaining);

        position.volume_remaining -= amount;
        position.realized_partials.push(crate::position::PartialExecution {
            level_id: level_id.clone(),
            fraction: level.percentage / 100.0,
            price: ctx.price,
            time: ctx.now,
        });
        let _ = position.apply(PositionEvent::Partial, Some(&format!("{}-{}", position.ticket, level_id)));

        decision.partial_closes.push(PartialCloseAction {
            level_id,
            fraction: level.percentage / 100.0,
            move_stop_to_breakeven: level.move_stop_to_breakeven,
        });

        if level.move_stop_to_breakeven && !position.breakeven_moved {
            let candidate = position.entry_price;
            decision.modify_stop = Some(best_stop(position.side, decision.modify_stop, candidate));
            position.breakeven_moved = true;
        }
    }
}

fn apply_trailing(
    position: &mut PositionRecord,
    spec: &ExitSpec,
    ctx: &ExitContext,
    decision: &mut ExitDecision,
) {
    let Some(trailing) = &spec.trailing else {
        return;
    };
    if !trailing.enabled {
        return;
    }

    let current_rr = position.current_rr(ctx.price);
    let active = trailing.activate_at_rr.map(|r| current_rr >= r).unwrap_or(true);
    if !active {
        return;
    }
    position.trailing_active = true;

    position.peak_favorable_price = match position.side {
        Side::Buy => position.peak_favorable_price.max(ctx.price),
        Side::Sell => position.peak_favorable_price.min(ctx.price),
    };

    let distance_pips = match &trailing.distance {
        TrailingDistance::Pips(pips) => *pips,
        TrailingDistance::AtrMultiplier(mult) => ctx.atr.unwrap_or(0.0) * mult,
    };
    if distance_pips <= 0.0 {
        return;
    }

    let candidate = position.peak_favorable_price - position.side.sign() * distance_pips;
    decision.modify_stop = Some(best_stop(position.side, decision.modify_stop, candidate));
}

fn apply_time_regime_session(
    position: &PositionRecord,
    spec: &ExitSpec,
    ctx: &ExitContext,
    decision: &mut ExitDecision,
) {
    if decision.full_close.is_some() {
        return;
    }

    if let Some(max_minutes) = spec
        .stop_loss
        .as_ref()
        .and_then(|s| s.max_holding_minutes)
    {
        let held = (ctx.now - position.entry_time).num_minutes();
        if held >= max_minutes {
            decision.full_close = Some(CloseReason::TimeExit);
            return;
        }
    }

    if let Some(regime) = ctx.current_regime {
        if ctx.regime_confidence >= spec.smart_exit.regime_change_confidence_threshold
            && spec.smart_exit.regime_change_exit
            && ctx.unfavorable_regimes.contains(&regime)
        {
            decision.full_close = Some(CloseReason::RegimeChange);
            return;
        }
    }

    if ctx.session_close_now && spec.smart_exit.session_close_auto_flatten {
        decision.full_close = Some(CloseReason::SessionClose);
    }
}

/// Keeps whichever of the existing and candidate stops is more favorable
/// (tighter to price in the position's favor) without ever moving the stop
/// against the position (spec §4.5: "stops only move monotonically in the
/// favorable direction; violations are discarded").
fn best_stop(side: Side, existing: Option<f64>, candidate: f64) -> f64 {
    match existing {
        None => candidate,
        Some(existing) => match side {
            Side::Buy => existing.max(candidate),
            Side::Sell => existing.min(candidate),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rex_schemas::{
        BreakevenSpec, PartialLevel, SmartExitSpec, StopLossKind, StopLossSpec, TakeProfitSpec,
        TrailingSpec,
    };

    fn base_exit_spec() -> ExitSpec {
        ExitSpec {
            stop_loss: Some(StopLossSpec {
                kind: StopLossKind::Pips { value: 25.0 },
                min_pips: None,
                max_pips: None,
                max_holding_minutes: Some(240),
            }),
            take_profit: Some(TakeProfitSpec::Pips { value: 40.0 }),
            trailing: Some(TrailingSpec {
                enabled: false,
                activate_at_rr: None,
                distance: TrailingDistance::Pips(10.0),
                step_pips: Some(1.0),
            }),
            smart_exit: SmartExitSpec::default(),
        }
    }

    fn position() -> PositionRecord {
        PositionRecord::new(
            "T1",
            "EURUSD",
            Side::Buy,
            1.1000,
            Utc::now(),
            1.0,
            Some(1.0975),
            Some(1.1040),
            0.0025,
        )
    }

    fn ctx(price: f64) -> ExitContext {
        ExitContext {
            price,
            now: Utc::now(),
            atr: Some(0.0015),
            current_regime: None,
            unfavorable_regimes: vec![],
            regime_confidence: 0.0,
            session_close_now: false,
        }
    }

    #[test]
    fn breakeven_fires_once_threshold_crossed() {
        let mut p = position();
        let mut spec = base_exit_spec();
        spec.smart_exit.breakeven = Some(BreakevenSpec {
            trigger_ratio: 1.0,
            buffer_pips: 0.0002,
        });
        let decision = evaluate(&mut p, &spec, &ctx(1.1026));
        assert_eq!(decision.modify_stop, Some(1.1002));
        assert!(p.breakeven_moved);

        let decision2 = evaluate(&mut p, &spec, &ctx(1.1030));
        assert_eq!(decision2.modify_stop, None, "breakeven must not repeat");
    }

    #[test]
    fn partial_level_executes_and_reduces_volume() {
        let mut p = position();
        let mut spec = base_exit_spec();
        spec.take_profit = Some(TakeProfitSpec::Partial {
            rr_ratio: 2.0,
            levels: vec![PartialLevel {
                percentage: 50.0,
                at_rr: 1.0,
                move_stop_to_breakeven: true,
            }],
        });
        let decision = evaluate(&mut p, &spec, &ctx(1.1025));
        assert_eq!(decision.partial_closes.len(), 1);
        assert_eq!(p.volume_remaining, 0.5);
        assert_eq!(decision.modify_stop, Some(1.1000));
    }

    #[test]
    fn take_profit_closes_full_volume() {
        let mut p = position();
        let spec = base_exit_spec();
        let decision = evaluate(&mut p, &spec, &ctx(1.1040));
        assert_eq!(decision.full_close, Some(CloseReason::TakeProfit));
    }

    #[test]
    fn take_profit_does_not_fire_before_target() {
        let mut p = position();
        let spec = base_exit_spec();
        let decision = evaluate(&mut p, &spec, &ctx(1.1030));
        assert_eq!(decision.full_close, None);
    }

    #[test]
    fn time_exit_fires_after_max_holding() {
        let mut p = position();
        p.entry_time = Utc::now() - chrono::Duration::minutes(300);
        let spec = base_exit_spec();
        let decision = evaluate(&mut p, &spec, &ctx(1.1010));
        assert_eq!(decision.full_close, Some(CloseReason::TimeExit));
    }

    #[test]
    fn trailing_only_moves_favorably() {
        let mut p = position();
        let mut spec = base_exit_spec();
        let trailing = spec.trailing.as_mut().unwrap();
        trailing.enabled = true;
        trailing.distance = TrailingDistance::Pips(0.0010);

        let d1 = evaluate(&mut p, &spec, &ctx(1.1030));
        assert_eq!(d1.modify_stop, Some(1.1020));

        // Price pulls back: peak_favorable_price doesn't regress, so the
        // stop candidate must not move backward either.
        let d2 = evaluate(&mut p, &spec, &ctx(1.1020));
        assert_eq!(d2.modify_stop, Some(1.1020));
    }
}
