use rex_schemas::VolatilitySpec;

use crate::context::FilterContext;
use crate::outcome::FilterOutcome;
use crate::stack::Filter;

pub struct VolatilityFilter {
    spec: VolatilitySpec,
}

impl VolatilityFilter {
    pub fn new(spec: VolatilitySpec) -> Self {
        Self { spec }
    }
}

impl Filter for VolatilityFilter {
    fn name(&self) -> &str {
        "volatility"
    }

    fn evaluate(&self, ctx: &FilterContext) -> FilterOutcome {
        if ctx.current_atr_pips < self.spec.min_atr_pips {
            return FilterOutcome::Block(format!(
                "atr {:.1} below min {:.1}",
                ctx.current_atr_pips, self.spec.min_atr_pips
            ));
        }
        if ctx.current_atr_pips > self.spec.max_atr_pips {
            return if self.spec.block_above_max {
                FilterOutcome::Block(format!(
                    "atr {:.1} above max {:.1}",
                    ctx.current_atr_pips, self.spec.max_atr_pips
                ))
            } else {
                FilterOutcome::ReduceSize(0.5)
            };
        }
        FilterOutcome::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn ctx(atr: f64) -> FilterContext {
        FilterContext {
            now: Utc::now(),
            symbol: "EURUSD".to_string(),
            bid: 1.1,
            ask: 1.1002,
            point_size: 0.0001,
            current_atr_pips: atr,
            candidate_log_returns: vec![],
            open_symbol_log_returns: HashMap::new(),
        }
    }

    fn spec(block_above_max: bool) -> VolatilitySpec {
        VolatilitySpec {
            min_atr_pips: 5.0,
            max_atr_pips: 30.0,
            atr_period: 14,
            block_above_max,
        }
    }

    #[test]
    fn below_min_blocks() {
        let filter = VolatilityFilter::new(spec(false));
        assert!(filter.evaluate(&ctx(2.0)).is_block());
    }

    #[test]
    fn above_max_reduces_size_when_not_blocking() {
        let filter = VolatilityFilter::new(spec(false));
        assert_eq!(filter.evaluate(&ctx(40.0)), FilterOutcome::ReduceSize(0.5));
    }

    #[test]
    fn above_max_blocks_when_configured() {
        let filter = VolatilityFilter::new(spec(true));
        assert!(filter.evaluate(&ctx(40.0)).is_block());
    }

    #[test]
    fn within_band_allows() {
        let filter = VolatilityFilter::new(spec(false));
        assert_eq!(filter.evaluate(&ctx(15.0)), FilterOutcome::Allow);
    }
}
