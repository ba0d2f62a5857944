use std::collections::HashMap;

use chrono::NaiveDate;

use crate::fixedpoint::Micros;

/// Retention window for per-(strategy, day) buckets (spec §3: "retained 7
/// days").
pub const RETENTION_DAYS: i64 = 7;

#[derive(Clone, Debug, Default, PartialEq)]
struct DayBucket {
    trade_count: u32,
    realized_loss: Micros,
}

/// Per-(strategy, calendar-day) trade count and realized loss, read by
/// RiskGate through a snapshot (spec §3, §4.7: "single-writer, read by
/// RiskGate through a snapshot interface").
#[derive(Clone, Debug, Default)]
pub struct DailyCounters {
    buckets: HashMap<(String, NaiveDate), DayBucket>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DailyCounterSnapshot {
    pub trade_count: u32,
    pub realized_loss: Micros,
}

impl DailyCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one closed trade's realized PnL for `(strategy_id, day)`.
    /// Only losses accumulate into `realized_loss`; winning trades still
    /// count toward `trade_count` (spec §4.4 consults both independently).
    pub fn record_trade(&mut self, strategy_id: &str, day: NaiveDate, pnl: Micros) {
        let bucket = self
            .buckets
            .entry((strategy_id.to_string(), day))
            .or_default();
        bucket.trade_count += 1;
        if pnl.is_negative() {
            bucket.realized_loss = bucket.realized_loss.saturating_add(pnl.abs());
        }
    }

    /// Aggregate snapshot for `strategy_id` over `[today - RETENTION_DAYS,
    /// today]`, inclusive.
    pub fn snapshot(&self, strategy_id: &str, today: NaiveDate) -> DailyCounterSnapshot {
        let cutoff = today - chrono::Duration::days(RETENTION_DAYS);
        let mut out = DailyCounterSnapshot::default();
        for ((id, day), bucket) in &self.buckets {
            if id == strategy_id && *day > cutoff && *day <= today {
                out.trade_count += bucket.trade_count;
                out.realized_loss = out.realized_loss.saturating_add(bucket.realized_loss);
            }
        }
        out
    }

    /// Snapshot for a single calendar day only (used for `maxDailyLoss` /
    /// `maxDailyTrades` gates, which are per-day rather than 7-day rolling).
    pub fn snapshot_for_day(&self, strategy_id: &str, day: NaiveDate) -> DailyCounterSnapshot {
        self.buckets
            .get(&(strategy_id.to_string(), day))
            .map(|b| DailyCounterSnapshot {
                trade_count: b.trade_count,
                realized_loss: b.realized_loss,
            })
            .unwrap_or_default()
    }

    /// Drops buckets older than the retention window relative to `today`.
    pub fn prune(&mut self, today: NaiveDate) {
        let cutoff = today - chrono::Duration::days(RETENTION_DAYS);
        self.buckets.retain(|(_, day), _| *day > cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn records_loss_but_not_profit_in_realized_loss() {
        let mut counters = DailyCounters::new();
        let today = date(2026, 1, 10);
        counters.record_trade("s1", today, Micros::from_f64(-50.0));
        counters.record_trade("s1", today, Micros::from_f64(30.0));
        let snap = counters.snapshot_for_day("s1", today);
        assert_eq!(snap.trade_count, 2);
        assert_eq!(snap.realized_loss, Micros::from_f64(50.0));
    }

    #[test]
    fn rolling_snapshot_excludes_beyond_retention() {
        let mut counters = DailyCounters::new();
        let today = date(2026, 1, 10);
        let stale = today - chrono::Duration::days(8);
        counters.record_trade("s1", stale, Micros::from_f64(-100.0));
        counters.record_trade("s1", today, Micros::from_f64(-20.0));
        let snap = counters.snapshot("s1", today);
        assert_eq!(snap.trade_count, 1);
        assert_eq!(snap.realized_loss, Micros::from_f64(20.0));
    }

    #[test]
    fn prune_drops_buckets_past_retention() {
        let mut counters = DailyCounters::new();
        let today = date(2026, 1, 10);
        let stale = today - chrono::Duration::days(10);
        counters.record_trade("s1", stale, Micros::from_f64(-5.0));
        counters.prune(today);
        assert_eq!(counters.buckets.len(), 0);
    }

    #[test]
    fn different_strategies_are_isolated() {
        let mut counters = DailyCounters::new();
        let today = date(2026, 1, 10);
        counters.record_trade("s1", today, Micros::from_f64(-5.0));
        counters.record_trade("s2", today, Micros::from_f64(-5.0));
        assert_eq!(counters.snapshot_for_day("s1", today).trade_count, 1);
        assert_eq!(counters.snapshot_for_day("s2", today).trade_count, 1);
    }
}
