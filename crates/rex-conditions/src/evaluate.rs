use rex_schemas::{Comparator, Condition, EntryNode, Rhs};

use crate::cache::IndicatorCache;
use crate::warning::{ConditionWarning, ConditionWarningReason};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvalOutcome {
    pub matched: bool,
    pub matched_leaves: Vec<Condition>,
    pub warnings: Vec<ConditionWarning>,
}

/// Evaluates an `EntryTree` against an `IndicatorCache` at `last_index`
/// (spec §4.2). `AllOf` is true iff every child is true and the node is
/// non-empty; `AnyOf` is true iff any child is true.
pub fn evaluate(tree: &EntryNode, cache: &IndicatorCache, last_index: usize) -> EvalOutcome {
    let mut warnings = Vec::new();
    let mut matched_leaves = Vec::new();
    let matched = eval_node(tree, cache, last_index, &mut warnings, &mut matched_leaves);
    EvalOutcome {
        matched,
        matched_leaves,
        warnings,
    }
}

fn eval_node(
    node: &EntryNode,
    cache: &IndicatorCache,
    last_index: usize,
    warnings: &mut Vec<ConditionWarning>,
    matched_leaves: &mut Vec<Condition>,
) -> bool {
    match node {
        EntryNode::Leaf { condition } => {
            let matched = eval_leaf(condition, cache, last_index, warnings);
            if matched {
                matched_leaves.push(condition.clone());
            }
            matched
        }
        EntryNode::AllOf { nodes } => {
            // Evaluate every child regardless of short-circuiting so
            // `matched_leaves` reflects all leaves that fired, and so a
            // later sibling's warning is never silently skipped.
            let results: Vec<bool> = nodes
                .iter()
                .map(|n| eval_node(n, cache, last_index, warnings, matched_leaves))
                .collect();
            !results.is_empty() && results.into_iter().all(|b| b)
        }
        EntryNode::AnyOf { nodes } => {
            let results: Vec<bool> = nodes
                .iter()
                .map(|n| eval_node(n, cache, last_index, warnings, matched_leaves))
                .collect();
            results.into_iter().any(|b| b)
        }
    }
}

fn eval_leaf(
    condition: &Condition,
    cache: &IndicatorCache,
    last_index: usize,
    warnings: &mut Vec<ConditionWarning>,
) -> bool {
    let key = condition.indicator.cache_key();

    match condition.comparator {
        Comparator::Gt | Comparator::Lt | Comparator::Eq => {
            let lhs = cache.value_at(&key, last_index);
            let rhs = resolve_rhs(condition, cache, last_index, warnings);
            let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
                return false;
            };
            match condition.comparator {
                Comparator::Gt => lhs > rhs,
                Comparator::Lt => lhs < rhs,
                Comparator::Eq => (lhs - rhs).abs() < f64::EPSILON,
                _ => unreachable!(),
            }
        }
        Comparator::CrossesAbove | Comparator::CrossesBelow => {
            if last_index == 0 {
                warnings.push(ConditionWarning {
                    condition: condition.clone(),
                    reason: ConditionWarningReason::InsufficientHistory,
                });
                return false;
            }
            let prev = last_index - 1;
            let a1 = cache.value_at(&key, last_index);
            let a0 = cache.value_at(&key, prev);
            let b1 = resolve_rhs(condition, cache, last_index, warnings);
            let b0 = resolve_rhs(condition, cache, prev, warnings);
            let (Some(a1), Some(a0), Some(b1), Some(b0)) = (a1, a0, b1, b0) else {
                return false;
            };
            match condition.comparator {
                Comparator::CrossesAbove => a0 <= b0 && a1 > b1,
                Comparator::CrossesBelow => a0 >= b0 && a1 < b1,
                _ => unreachable!(),
            }
        }
        Comparator::BouncesFrom | Comparator::RejectsFrom => {
            eval_touch(condition, cache, last_index, warnings)
        }
    }
}

fn resolve_rhs(
    condition: &Condition,
    cache: &IndicatorCache,
    index: usize,
    warnings: &mut Vec<ConditionWarning>,
) -> Option<f64> {
    match &condition.rhs {
        Rhs::Const(value) => Some(*value),
        Rhs::Symbol(name) => {
            let resolved = cache.resolve_symbol(name, index);
            if resolved.is_none() {
                warnings.push(ConditionWarning {
                    condition: condition.clone(),
                    reason: ConditionWarningReason::UnresolvedSymbol(name.clone()),
                });
            }
            resolved
        }
    }
}

/// `bouncesFrom(price, ref, tol)`: within the prior 3 bars the touch series
/// entered `[ref-tol, ref+tol]`, and the current close is above `ref`.
/// `rejectsFrom` is the symmetric inverse (close below `ref`).
fn eval_touch(
    condition: &Condition,
    cache: &IndicatorCache,
    last_index: usize,
    warnings: &mut Vec<ConditionWarning>,
) -> bool {
    let key = condition.indicator.cache_key();
    let Some(touch_series) = cache.get(&key) else {
        warnings.push(ConditionWarning {
            condition: condition.clone(),
            reason: ConditionWarningReason::MissingIndicator(key),
        });
        return false;
    };
    let Some(close_series) = cache.close_series() else {
        warnings.push(ConditionWarning {
            condition: condition.clone(),
            reason: ConditionWarningReason::MissingIndicator("close".to_string()),
        });
        return false;
    };
    let Some(reference) = resolve_rhs(condition, cache, last_index, warnings) else {
        return false;
    };
    let tol = condition.tolerance;

    let lookback_start = last_index.saturating_sub(2);
    let touched = (lookback_start..=last_index).any(|i| {
        touch_series
            .get(i)
            .copied()
            .flatten()
            .map(|v| v >= reference - tol && v <= reference + tol)
            .unwrap_or(false)
    });
    if !touched {
        return false;
    }

    let Some(close) = close_series.get(last_index).copied().flatten() else {
        return false;
    };

    match condition.comparator {
        Comparator::BouncesFrom => close > reference,
        Comparator::RejectsFrom => close < reference,
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rex_schemas::IndicatorRef;

    fn cache_with(series: Vec<(&str, Vec<Option<f64>>)>) -> IndicatorCache {
        let mut cache = IndicatorCache::new(0.0001);
        for (k, v) in series {
            cache.set(k, v);
        }
        cache
    }

    #[test]
    fn gt_comparator_against_const() {
        let cache = cache_with(vec![("rsi(14)", vec![Some(72.0)])]);
        let cond = Condition::new(
            IndicatorRef::new("rsi", vec![14]),
            Comparator::Gt,
            Rhs::Const(70.0),
        );
        let tree = EntryNode::leaf(cond);
        let out = evaluate(&tree, &cache, 0);
        assert!(out.matched);
        assert_eq!(out.matched_leaves.len(), 1);
    }

    #[test]
    fn crosses_above_requires_two_bars() {
        let mut cache = cache_with(vec![("ema(9)", vec![Some(1.0), Some(2.0)])]);
        cache.set("ema_21", vec![Some(1.5), Some(1.5)]);
        let cond = Condition::new(
            IndicatorRef::new("ema", vec![9]),
            Comparator::CrossesAbove,
            Rhs::Symbol("ema_21".to_string()),
        );
        let tree = EntryNode::leaf(cond);
        let out = evaluate(&tree, &cache, 1);
        assert!(out.matched);
    }

    #[test]
    fn empty_all_of_is_false() {
        let cache = IndicatorCache::new(0.0001);
        let tree = EntryNode::all_of(vec![]);
        let out = evaluate(&tree, &cache, 0);
        assert!(!out.matched);
    }

    #[test]
    fn unresolved_symbol_emits_warning_not_panic() {
        let cache = cache_with(vec![("rsi(14)", vec![Some(50.0)])]);
        let cond = Condition::new(
            IndicatorRef::new("rsi", vec![14]),
            Comparator::Gt,
            Rhs::Symbol("nonexistent".to_string()),
        );
        let tree = EntryNode::leaf(cond);
        let out = evaluate(&tree, &cache, 0);
        assert!(!out.matched);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn bounces_from_requires_touch_then_close_above() {
        let cache = cache_with(vec![
            ("low", vec![Some(1.20), Some(1.10), Some(1.15)]),
            ("close", vec![Some(1.22), Some(1.12), Some(1.25)]),
        ]);
        let cond = Condition::new(
            IndicatorRef::new("low", vec![]),
            Comparator::BouncesFrom,
            Rhs::Const(1.10),
        )
        .with_tolerance(0.02);
        let tree = EntryNode::leaf(cond);
        let out = evaluate(&tree, &cache, 2);
        assert!(out.matched);
    }
}
