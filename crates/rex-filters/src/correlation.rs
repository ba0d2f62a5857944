use rex_schemas::CorrelationFilterSpec;

use crate::context::FilterContext;
use crate::outcome::FilterOutcome;
use crate::stack::Filter;

pub struct CorrelationFilter {
    spec: CorrelationFilterSpec,
}

impl CorrelationFilter {
    pub fn new(spec: CorrelationFilterSpec) -> Self {
        Self { spec }
    }
}

impl Filter for CorrelationFilter {
    fn name(&self) -> &str {
        "correlation"
    }

    fn evaluate(&self, ctx: &FilterContext) -> FilterOutcome {
        if !self.spec.enabled {
            return FilterOutcome::Allow;
        }

        let mut worst: Option<f64> = None;
        for (symbol, returns) in &ctx.open_symbol_log_returns {
            if *symbol == ctx.symbol {
                continue;
            }
            // §9 open question: a pair with insufficient overlapping history
            // is skipped rather than blocked — it carries no evidence either
            // way, and blocking on absent data would be a false positive.
            if returns.len() < 2 || ctx.candidate_log_returns.len() < 2 {
                continue;
            }
            if let Some(corr) = pearson_correlation(&ctx.candidate_log_returns, returns) {
                worst = Some(worst.map_or(corr.abs(), |w: f64| w.max(corr.abs())));
            }
        }

        match worst {
            Some(corr) if corr > self.spec.max_correlation => {
                if self.spec.reduce_size_instead {
                    FilterOutcome::ReduceSize(0.5)
                } else {
                    FilterOutcome::Block(format!(
                        "correlation {corr:.2} exceeds max {:.2}",
                        self.spec.max_correlation
                    ))
                }
            }
            _ => FilterOutcome::Allow,
        }
    }
}

/// Pearson correlation over the overlapping suffix of both series. Returns
/// `None` if either series has zero variance (undefined correlation).
fn pearson_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let a = &a[a.len() - n..];
    let b = &b[b.len() - n..];

    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }

    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rex_schemas::CorrelationGrouping;
    use std::collections::HashMap;

    fn ctx(candidate: Vec<f64>, open: HashMap<String, Vec<f64>>) -> FilterContext {
        FilterContext {
            now: Utc::now(),
            symbol: "EURUSD".to_string(),
            bid: 1.1,
            ask: 1.1002,
            point_size: 0.0001,
            current_atr_pips: 10.0,
            candidate_log_returns: candidate,
            open_symbol_log_returns: open,
        }
    }

    fn spec(max: f64, reduce: bool) -> CorrelationFilterSpec {
        CorrelationFilterSpec {
            enabled: true,
            max_correlation: max,
            lookback_period: 20,
            grouping: CorrelationGrouping::Pairwise,
            reduce_size_instead: reduce,
        }
    }

    #[test]
    fn identical_series_is_fully_correlated_and_blocks() {
        let series = vec![0.01, -0.02, 0.015, 0.005, -0.01];
        let mut open = HashMap::new();
        open.insert("GBPUSD".to_string(), series.clone());
        let filter = CorrelationFilter::new(spec(0.8, false));
        assert!(filter.evaluate(&ctx(series, open)).is_block());
    }

    #[test]
    fn insufficient_history_is_skipped_not_blocked() {
        let mut open = HashMap::new();
        open.insert("GBPUSD".to_string(), vec![0.01]);
        let filter = CorrelationFilter::new(spec(0.5, false));
        assert_eq!(
            filter.evaluate(&ctx(vec![0.01, 0.02], open)),
            FilterOutcome::Allow
        );
    }

    #[test]
    fn disabled_filter_always_allows() {
        let mut spec = spec(0.1, false);
        spec.enabled = false;
        let series = vec![0.01, -0.02, 0.015];
        let mut open = HashMap::new();
        open.insert("GBPUSD".to_string(), series.clone());
        let filter = CorrelationFilter::new(spec);
        assert_eq!(filter.evaluate(&ctx(series, open)), FilterOutcome::Allow);
    }
}
