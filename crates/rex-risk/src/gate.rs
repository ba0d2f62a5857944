use rex_schemas::RiskSpec;

use crate::types::{OpenPositionSummary, ReasonCode, RiskDecision, RiskInput, RiskState};

/// Portfolio capacity/circuit-breaker gates, distinct from FilterStack's
/// market-condition gates (spec §4.4). Evaluated in the order the spec
/// enumerates the limits; the first breach short-circuits.
pub fn evaluate(spec: &RiskSpec, state: &mut RiskState, input: &RiskInput) -> RiskDecision {
    if state.halted {
        return RiskDecision::Block(ReasonCode::AlreadyHalted);
    }

    if input.open_positions.len() as u32 >= spec.max_positions {
        return RiskDecision::Block(ReasonCode::MaxPositionsReached);
    }

    let same_symbol_count = input
        .open_positions
        .iter()
        .filter(|p| p.symbol == input.symbol)
        .count() as u32;
    if same_symbol_count >= spec.max_positions_per_symbol {
        return RiskDecision::Block(ReasonCode::MaxPositionsPerSymbolReached);
    }

    if spec.max_daily_loss_ccy > 0.0 && input.daily.realized_loss.to_f64() >= spec.max_daily_loss_ccy
    {
        state.halted = true;
        return RiskDecision::Block(ReasonCode::MaxDailyLossBreached);
    }

    if spec.max_daily_trades > 0 && input.daily.trade_count >= spec.max_daily_trades {
        return RiskDecision::Block(ReasonCode::MaxDailyTradesReached);
    }

    if spec.max_drawdown_pct > 0.0 {
        let drawdown_pct = if input.balance.raw() > 0 {
            (input.balance - input.equity).to_f64() / input.balance.to_f64() * 100.0
        } else {
            0.0
        };
        if drawdown_pct >= spec.max_drawdown_pct {
            state.halted = true;
            return RiskDecision::Block(ReasonCode::MaxDrawdownBreached);
        }
    }

    if spec.max_consecutive_losses > 0 && state.consecutive_losses >= spec.max_consecutive_losses {
        state.halted = true;
        return RiskDecision::Block(ReasonCode::MaxConsecutiveLossesReached);
    }

    if let Some(reason) = check_currency_correlation(spec, input) {
        return RiskDecision::Block(reason);
    }

    RiskDecision::Allow
}

/// `byCurrency` grouping (spec §4.4/§4.3): block when the candidate symbol
/// shares a currency leg with an open position and the configured pairwise
/// limit is already saturated by that shared-currency exposure. This is a
/// coarser, currency-exposure check than FilterStack's pairwise log-return
/// correlation — it has no price history of its own, only currency overlap.
fn check_currency_correlation(spec: &RiskSpec, input: &RiskInput) -> Option<ReasonCode> {
    if !spec.correlation.enabled
        || spec.correlation.grouping != rex_schemas::CorrelationGrouping::ByCurrency
    {
        return None;
    }

    for position in &input.open_positions {
        if position.symbol == input.symbol {
            continue;
        }
        if shares_currency(&input.symbol_currencies, position) {
            return Some(ReasonCode::CorrelationExceeded {
                other_symbol: position.symbol.clone(),
                correlation: 1.0,
            });
        }
    }

    None
}

fn shares_currency(candidate_currencies: &[String], position: &OpenPositionSummary) -> bool {
    candidate_currencies
        .iter()
        .any(|c| position.currencies.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rex_portfolio::{DailyCounterSnapshot, Micros};
    use rex_schemas::{CorrelationGrouping, CorrelationSpec};

    fn spec() -> RiskSpec {
        RiskSpec {
            risk_percent_per_trade: 0.5,
            max_positions: 5,
            max_positions_per_symbol: 2,
            max_daily_loss_ccy: 500.0,
            max_daily_trades: 10,
            max_drawdown_pct: 20.0,
            max_consecutive_losses: 4,
            correlation: CorrelationSpec::disabled(),
        }
    }

    fn input() -> RiskInput {
        RiskInput {
            symbol: "EURUSD".to_string(),
            symbol_currencies: vec!["EUR".to_string(), "USD".to_string()],
            equity: Micros::from_f64(10_000.0),
            balance: Micros::from_f64(10_000.0),
            open_positions: vec![],
            daily: DailyCounterSnapshot::default(),
            max_daily_loss: Micros::from_f64(500.0),
        }
    }

    #[test]
    fn allows_when_nothing_breached() {
        let mut state = RiskState::new();
        assert_eq!(evaluate(&spec(), &mut state, &input()), RiskDecision::Allow);
    }

    #[test]
    fn blocks_at_max_positions() {
        let mut state = RiskState::new();
        let mut inp = input();
        inp.open_positions = (0..5)
            .map(|i| OpenPositionSummary {
                symbol: format!("SYM{i}"),
                currencies: vec![],
            })
            .collect();
        assert_eq!(
            evaluate(&spec(), &mut state, &inp),
            RiskDecision::Block(ReasonCode::MaxPositionsReached)
        );
    }

    #[test]
    fn halts_sticky_on_drawdown_breach() {
        let mut state = RiskState::new();
        let mut inp = input();
        inp.equity = Micros::from_f64(7_500.0); // 25% drawdown
        let decision = evaluate(&spec(), &mut state, &inp);
        assert_eq!(decision, RiskDecision::Block(ReasonCode::MaxDrawdownBreached));
        assert!(state.halted);

        // Sticky: next call blocks even with healthy equity.
        let healthy = input();
        assert_eq!(
            evaluate(&spec(), &mut state, &healthy),
            RiskDecision::Block(ReasonCode::AlreadyHalted)
        );
    }

    #[test]
    fn consecutive_losses_halts() {
        let mut state = RiskState::new();
        for _ in 0..4 {
            state.record_trade_result(false);
        }
        let decision = evaluate(&spec(), &mut state, &input());
        assert_eq!(
            decision,
            RiskDecision::Block(ReasonCode::MaxConsecutiveLossesReached)
        );
    }

    #[test]
    fn currency_correlation_blocks_shared_leg() {
        let mut s = spec();
        s.correlation = CorrelationSpec {
            enabled: true,
            max_pair: 0.8,
            grouping: CorrelationGrouping::ByCurrency,
            lookback_period: 50,
        };
        let mut state = RiskState::new();
        let mut inp = input();
        inp.open_positions = vec![OpenPositionSummary {
            symbol: "GBPUSD".to_string(),
            currencies: vec!["GBP".to_string(), "USD".to_string()],
        }];
        assert!(matches!(
            evaluate(&s, &mut state, &inp),
            RiskDecision::Block(ReasonCode::CorrelationExceeded { .. })
        ));
    }
}
