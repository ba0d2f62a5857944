use crate::context::FilterContext;
use crate::outcome::FilterOutcome;

pub trait Filter: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, ctx: &FilterContext) -> FilterOutcome;
}

/// Ordered gate chain (spec §4.3). The first `Block` short-circuits the
/// remaining filters; `ReduceSize` factors compose multiplicatively.
pub struct FilterStack {
    filters: Vec<Box<dyn Filter>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterStackResult {
    pub outcome: FilterOutcome,
    /// Name of every filter consulted before the stack stopped.
    pub evaluated: Vec<String>,
}

impl FilterStack {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        Self { filters }
    }

    pub fn evaluate(&self, ctx: &FilterContext) -> FilterStackResult {
        let mut evaluated = Vec::new();
        let mut size_factor = 1.0f64;

        for filter in &self.filters {
            evaluated.push(filter.name().to_string());
            match filter.evaluate(ctx) {
                FilterOutcome::Block(reason) => {
                    return FilterStackResult {
                        outcome: FilterOutcome::Block(reason),
                        evaluated,
                    };
                }
                FilterOutcome::ReduceSize(factor) => size_factor *= factor,
                FilterOutcome::Allow => {}
            }
        }

        let outcome = if size_factor < 1.0 {
            FilterOutcome::ReduceSize(size_factor)
        } else {
            FilterOutcome::Allow
        };

        FilterStackResult { outcome, evaluated }
    }
}
