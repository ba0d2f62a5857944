//! rex-portfolio
//!
//! Account/PnL bookkeeping shared by RiskGate and the local HTTP surface:
//! the fixed-point money type, the broker account snapshot, and the
//! per-(strategy, day) counters RiskGate reads for daily-loss and
//! daily-trade gates (spec §3, §4.4).

mod account;
mod daily_counters;
mod fixedpoint;

pub use account::AccountSnapshot;
pub use daily_counters::{DailyCounterSnapshot, DailyCounters, RETENTION_DAYS};
pub use fixedpoint::Micros;
