/// Result of a single gate evaluation (spec §4.3).
#[derive(Clone, Debug, PartialEq)]
pub enum FilterOutcome {
    Allow,
    /// Multiplicative size reduction factor in `(0, 1]`.
    ReduceSize(f64),
    Block(String),
}

impl FilterOutcome {
    pub fn is_block(&self) -> bool {
        matches!(self, FilterOutcome::Block(_))
    }
}
