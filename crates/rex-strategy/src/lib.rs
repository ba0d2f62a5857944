//! rex-strategy — StrategyRuntime (spec §4.6)
//!
//! One Tokio task per running strategy: rebuilds the `IndicatorCache` on
//! every bar close, drives entry and exit evaluation, and applies commands
//! from its mailbox idempotently.

mod cache_builder;
mod runtime;
mod state;

pub use cache_builder::{all_leaves_warm, build_cache, required_history_bars, CacheBuildError};
pub use runtime::{PollCadence, StrategyRuntime};
pub use state::{RuntimeSnapshot, RuntimeState, RuntimeStats, RuntimeStatus};
