use std::sync::Arc;

use chrono::Duration;

use rex_schemas::NewsSpec;

use crate::context::{FilterContext, NewsCalendar};
use crate::outcome::FilterOutcome;
use crate::stack::Filter;

pub struct NewsFilter {
    spec: NewsSpec,
    calendar: Arc<dyn NewsCalendar>,
}

impl NewsFilter {
    pub fn new(spec: NewsSpec, calendar: Arc<dyn NewsCalendar>) -> Self {
        Self { spec, calendar }
    }
}

impl Filter for NewsFilter {
    fn name(&self) -> &str {
        "news"
    }

    fn evaluate(&self, ctx: &FilterContext) -> FilterOutcome {
        let events = self.calendar.events_near(&ctx.symbol, ctx.now);
        let before = Duration::minutes(self.spec.pause_before_min);
        let after = Duration::minutes(self.spec.pause_after_min);

        for event in events {
            if !self.spec.impact_levels.contains(&event.impact) {
                continue;
            }
            let window_start = event.time - before;
            let window_end = event.time + after;
            if ctx.now >= window_start && ctx.now <= window_end {
                return FilterOutcome::Block(format!(
                    "within news window for {} at {}",
                    ctx.symbol, event.time
                ));
            }
        }

        FilterOutcome::Allow
    }
}
