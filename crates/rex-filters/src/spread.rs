use rex_schemas::SpreadSpec;

use crate::context::FilterContext;
use crate::outcome::FilterOutcome;
use crate::stack::Filter;

pub struct SpreadFilter {
    spec: SpreadSpec,
}

impl SpreadFilter {
    pub fn new(spec: SpreadSpec) -> Self {
        Self { spec }
    }
}

impl Filter for SpreadFilter {
    fn name(&self) -> &str {
        "spread"
    }

    fn evaluate(&self, ctx: &FilterContext) -> FilterOutcome {
        let spread_pips = (ctx.ask - ctx.bid) / ctx.point_size;
        if spread_pips > self.spec.max_pips {
            FilterOutcome::Block(format!(
                "spread {spread_pips:.1} pips exceeds max {:.1}",
                self.spec.max_pips
            ))
        } else {
            FilterOutcome::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn ctx(bid: f64, ask: f64) -> FilterContext {
        FilterContext {
            now: Utc::now(),
            symbol: "EURUSD".to_string(),
            bid,
            ask,
            point_size: 0.0001,
            current_atr_pips: 10.0,
            candidate_log_returns: vec![],
            open_symbol_log_returns: HashMap::new(),
        }
    }

    #[test]
    fn within_max_allows() {
        let filter = SpreadFilter::new(SpreadSpec { max_pips: 2.0 });
        assert_eq!(filter.evaluate(&ctx(1.1000, 1.1001)), FilterOutcome::Allow);
    }

    #[test]
    fn over_max_blocks() {
        let filter = SpreadFilter::new(SpreadSpec { max_pips: 1.0 });
        assert!(filter.evaluate(&ctx(1.1000, 1.1005)).is_block());
    }
}
