//! Shared test fixtures for scenario tests across the rex-* crates.
//!
//! Kept deliberately small: a strategy config builder and an in-memory
//! `ExecutorCore` builder, so that scenario tests in rex-runtime and
//! rex-daemon don't each hand-roll their own copy of the same fixture.

use std::sync::Arc;

use rex_broker::{AccountInfo, PaperBroker};
use rex_platform::InMemoryPlatformLink;
use rex_runtime::ExecutorCore;
use rex_schemas::{
    Comparator, Condition, CorrelationFilterSpec, CorrelationSpec, EntryNode, ExitSpec, FilterSpec,
    IndicatorRef, NewsImpact, NewsSpec, Rhs, RiskSpec, SessionSpec, SpreadSpec, StopLossKind,
    StopLossSpec, StrategyConfig, Timeframe, VolatilitySpec,
};

/// A $10,000 demo account, matching the default a fresh rex-daemon boots with.
pub fn demo_account() -> AccountInfo {
    AccountInfo {
        balance: 10_000.0,
        equity: 10_000.0,
        margin: 0.0,
        free_margin: 10_000.0,
        currency: "USD".to_string(),
    }
}

/// A minimal, always-valid `StrategyConfig`: an unconditional entry node, a
/// fixed stop-loss, no take-profit, and every filter wide open. Good enough
/// to exercise the runtime lifecycle; not meant to reflect a real trader's
/// settings.
pub fn test_strategy_config(id: &str) -> StrategyConfig {
    StrategyConfig {
        id: id.to_string(),
        name: "test strategy".to_string(),
        symbol: "EURUSD".to_string(),
        timeframe: Timeframe::M1,
        entry_tree: EntryNode::leaf(Condition::new(
            IndicatorRef::new("ema", vec![9]),
            Comparator::Gt,
            Rhs::Const(0.0),
        )),
        exit_spec: ExitSpec {
            stop_loss: Some(StopLossSpec {
                kind: StopLossKind::Pips { value: 25.0 },
                min_pips: None,
                max_pips: None,
                max_holding_minutes: None,
            }),
            take_profit: None,
            trailing: None,
            smart_exit: Default::default(),
        },
        risk_spec: RiskSpec {
            risk_percent_per_trade: 1.0,
            max_positions: 5,
            max_positions_per_symbol: 1,
            max_daily_loss_ccy: 0.0,
            max_daily_trades: 0,
            max_drawdown_pct: 0.0,
            max_consecutive_losses: 0,
            correlation: CorrelationSpec::disabled(),
        },
        filter_spec: FilterSpec {
            session: SessionSpec {
                allowed_sessions: vec!["london".to_string(), "newyork".to_string()],
                weekend_mode: false,
                weekend_allowances: vec![],
                optimal_times: vec![],
            },
            spread: SpreadSpec { max_pips: 999.0 },
            volatility: VolatilitySpec {
                min_atr_pips: 0.0,
                max_atr_pips: 999.0,
                atr_period: 14,
                block_above_max: false,
            },
            news: NewsSpec {
                pause_before_min: 0,
                pause_after_min: 0,
                impact_levels: vec![NewsImpact::High],
            },
            correlation: CorrelationFilterSpec::from(&CorrelationSpec::disabled()),
        },
    }
}

/// An `ExecutorCore` wired to a paper broker, an in-memory platform link, and
/// a named in-memory sqlite db. Each caller must pass a unique `db_name` —
/// sqlite's shared-cache in-memory mode is keyed by name and process-global,
/// so reusing a name across parallel tests leaks state between them.
pub async fn test_executor(db_name: &str) -> anyhow::Result<Arc<ExecutorCore>> {
    let db = rex_db::connect(&format!("file:{db_name}?mode=memory&cache=shared")).await?;
    rex_db::migrate(&db).await?;

    let broker: Arc<dyn rex_broker::BrokerClient> = Arc::new(PaperBroker::new(demo_account()));
    let platform: Arc<dyn rex_platform::PlatformLink> = Arc::new(InMemoryPlatformLink::new());

    Ok(Arc::new(ExecutorCore::new("exec-test", broker, platform, db)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_strategy_config_passes_validation() {
        let config = test_strategy_config("strat-validate");
        config.validate().expect("fixture config must be valid");
    }

    #[tokio::test]
    async fn test_executor_boots_with_no_persisted_strategies() {
        let core = test_executor("testkit_boot_empty").await.unwrap();
        core.boot().await.unwrap();
        assert_eq!(core.active_runtime_count().await, 0);
    }
}
