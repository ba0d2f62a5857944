use rex_schemas::Condition;

/// Non-fatal evaluation hiccup, surfaced by `evaluate` rather than logged
/// directly (spec §4.2: "emits a structured warning, not fatal"). The
/// caller (`StrategyRuntime`) decides how to log it.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionWarning {
    pub condition: Condition,
    pub reason: ConditionWarningReason,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConditionWarningReason {
    /// The RHS symbol did not resolve against the primary or MTF cache.
    UnresolvedSymbol(String),
    /// The LHS indicator has no entry in the cache at all.
    MissingIndicator(String),
    /// Not enough history at `lastIndex` for a comparator requiring it.
    InsufficientHistory,
}
