//! rex-schemas
//!
//! Wire and domain types shared across the executor core: strategy
//! configuration, the entry-condition tree, exit/risk/filter specs,
//! commands, and outbound trade events. No I/O, no behavior — plain data
//! plus the few structural invariants spelled out in spec §3.

pub mod bar;
pub mod command;
pub mod entry_tree;
pub mod exit_spec;
pub mod filter_spec;
pub mod risk_spec;
pub mod strategy_config;
pub mod trade_event;

pub use bar::{Bar, Timeframe};
pub use command::{Command, CommandKind};
pub use entry_tree::{Comparator, Condition, EntryNode, IndicatorRef, Rhs};
pub use exit_spec::{
    BreakevenSpec, DynamicTrailingSpec, ExitSpec, PartialLevel, SmartExitSpec, StopLossKind,
    StopLossSpec, TakeProfitSpec, TrailingDistance, TrailingSpec,
};
pub use filter_spec::{
    CorrelationFilterSpec, FilterSpec, NewsImpact, NewsSpec, SessionSpec, SpreadSpec,
    VolatilitySpec, WeekendAllowance,
};
pub use risk_spec::{CorrelationGrouping, CorrelationSpec, RiskSpec};
pub use strategy_config::{StrategyConfig, StrategyConfigError};
pub use trade_event::{EventKind, Side, TradeEvent};
