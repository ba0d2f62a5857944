use serde::{Deserialize, Serialize};

/// Named indicator with its computation parameters, as referenced by a
/// `Condition`. `params` is a small ordered list rather than a map so the
/// `(indicator, params)` pair hashes/compares cheaply as a cache key
/// (ConditionEngine, spec §4.2).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRef {
    pub name: String,
    pub params: Vec<i64>,
}

impl IndicatorRef {
    pub fn new(name: impl Into<String>, params: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Cache key string, e.g. `"ema(21)"`, `"bollinger(20,2)"`.
    pub fn cache_key(&self) -> String {
        let params = self
            .params
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({})", self.name, params)
    }
}

/// Right-hand side of a `Condition`: either a numeric literal or a symbolic
/// reference resolved against the `IndicatorCache` (spec §4.2), e.g.
/// `price`, `ema_200`, `bollinger_upper`, `ema_200_minus_2pips`, `h1_high`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rhs {
    Const(f64),
    Symbol(String),
}

/// Comparator semantics, spec §4.2.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Comparator {
    Gt,
    Lt,
    Eq,
    CrossesAbove,
    CrossesBelow,
    BouncesFrom,
    RejectsFrom,
}

impl Comparator {
    /// `true` for comparators that require the prior-bar (`n-2`) value.
    pub fn needs_history(self) -> bool {
        matches!(
            self,
            Comparator::CrossesAbove
                | Comparator::CrossesBelow
                | Comparator::BouncesFrom
                | Comparator::RejectsFrom
        )
    }
}

/// A single leaf predicate: `{indicator, params, comparator, rhs}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub indicator: IndicatorRef,
    pub comparator: Comparator,
    pub rhs: Rhs,
    /// Tolerance band for `bouncesFrom`/`rejectsFrom`, in price units.
    /// Ignored by other comparators.
    #[serde(default)]
    pub tolerance: f64,
}

impl Condition {
    pub fn new(indicator: IndicatorRef, comparator: Comparator, rhs: Rhs) -> Self {
        Self {
            indicator,
            comparator,
            rhs,
            tolerance: 0.0,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Boolean expression over `Condition`s (spec §3 EntryTree).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EntryNode {
    AllOf { nodes: Vec<EntryNode> },
    AnyOf { nodes: Vec<EntryNode> },
    Leaf { condition: Condition },
}

impl EntryNode {
    pub fn leaf(condition: Condition) -> Self {
        EntryNode::Leaf { condition }
    }

    pub fn all_of(nodes: Vec<EntryNode>) -> Self {
        EntryNode::AllOf { nodes }
    }

    pub fn any_of(nodes: Vec<EntryNode>) -> Self {
        EntryNode::AnyOf { nodes }
    }

    /// `true` iff the tree has at least one leaf; required by the
    /// `StrategyConfig` invariant (spec §3: "entryTree non-empty").
    pub fn is_non_empty(&self) -> bool {
        match self {
            EntryNode::Leaf { .. } => true,
            EntryNode::AllOf { nodes } | EntryNode::AnyOf { nodes } => {
                !nodes.is_empty() && nodes.iter().any(EntryNode::is_non_empty)
            }
        }
    }
}
