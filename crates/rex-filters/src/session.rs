use chrono::{Datelike, Timelike};

use rex_schemas::SessionSpec;

use crate::context::FilterContext;
use crate::outcome::FilterOutcome;
use crate::stack::Filter;

/// Named trading sessions, all UTC (spec §4.3). Tokyo and Sydney wrap past
/// midnight.
fn session_hours(name: &str) -> Option<(u8, u8)> {
    match name {
        "London" => Some((7, 16)),
        "NewYork" => Some((12, 21)),
        "Tokyo" => Some((23, 8)),
        "Sydney" => Some((21, 6)),
        _ => None,
    }
}

fn hour_in_range(hour: u8, start: u8, end: u8) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

pub struct SessionFilter {
    spec: SessionSpec,
}

impl SessionFilter {
    pub fn new(spec: SessionSpec) -> Self {
        Self { spec }
    }

    fn is_weekend(weekday: u8) -> bool {
        weekday == 0 || weekday == 6
    }
}

impl Filter for SessionFilter {
    fn name(&self) -> &str {
        "session"
    }

    fn evaluate(&self, ctx: &FilterContext) -> FilterOutcome {
        let hour = ctx.now.hour() as u8;
        // chrono's weekday Mon=0..Sun=6; spec uses Sun=0..Sat=6.
        let weekday = (ctx.now.weekday().num_days_from_sunday()) as u8;

        if Self::is_weekend(weekday) {
            if !self.spec.weekend_mode {
                return FilterOutcome::Block("weekend trading disabled".to_string());
            }
            let allowed = self.spec.weekend_allowances.iter().any(|a| {
                a.weekday == weekday && hour_in_range(hour, a.start_hour_utc, a.end_hour_utc)
            });
            return if allowed {
                FilterOutcome::Allow
            } else {
                FilterOutcome::Block("outside weekend allowance window".to_string())
            };
        }

        let allowed = self.spec.allowed_sessions.iter().any(|name| {
            session_hours(name)
                .map(|(start, end)| hour_in_range(hour, start, end))
                .unwrap_or(false)
        });

        if allowed {
            FilterOutcome::Allow
        } else {
            FilterOutcome::Block("outside allowed session".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn ctx_at(hour: u32, weekday_offset_days: i64) -> FilterContext {
        // 2024-01-01 is a Monday; offset to land on other weekdays.
        let base = utc_ymd(2024, 1, 1);
        let now = base + chrono::Duration::days(weekday_offset_days)
            + chrono::Duration::hours(hour as i64);
        FilterContext {
            now,
            symbol: "EURUSD".to_string(),
            bid: 1.1,
            ask: 1.1002,
            point_size: 0.0001,
            current_atr_pips: 10.0,
            candidate_log_returns: vec![],
            open_symbol_log_returns: HashMap::new(),
        }
    }

    fn utc_ymd(y: i32, m: u32, d: u32) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn london_session_allows_within_window() {
        let spec = SessionSpec {
            allowed_sessions: vec!["London".to_string()],
            weekend_mode: false,
            weekend_allowances: vec![],
            optimal_times: vec![],
        };
        let filter = SessionFilter::new(spec);
        let ctx = ctx_at(10, 0); // Monday 10:00 UTC
        assert_eq!(filter.evaluate(&ctx), FilterOutcome::Allow);
    }

    #[test]
    fn outside_session_blocks() {
        let spec = SessionSpec {
            allowed_sessions: vec!["London".to_string()],
            weekend_mode: false,
            weekend_allowances: vec![],
            optimal_times: vec![],
        };
        let filter = SessionFilter::new(spec);
        let ctx = ctx_at(20, 0); // Monday 20:00 UTC, outside London
        assert!(filter.evaluate(&ctx).is_block());
    }

    #[test]
    fn weekend_without_weekend_mode_blocks() {
        let spec = SessionSpec {
            allowed_sessions: vec!["London".to_string()],
            weekend_mode: false,
            weekend_allowances: vec![],
            optimal_times: vec![],
        };
        let filter = SessionFilter::new(spec);
        let ctx = ctx_at(10, 5); // Saturday
        assert!(filter.evaluate(&ctx).is_block());
    }

    #[test]
    fn tokyo_session_wraps_midnight() {
        assert!(hour_in_range(1, 23, 8));
        assert!(hour_in_range(23, 23, 8));
        assert!(!hour_in_range(9, 23, 8));
    }
}
