//! Maps an `EntryTree`'s indicator references onto `rex-indicators`'
//! computations, producing the `IndicatorCache` the `ConditionEngine` reads
//! (spec §4.2, §4.6 "populate IndicatorCache").

use std::collections::BTreeSet;

use rex_conditions::IndicatorCache;
use rex_indicators as ind;
use rex_schemas::{Bar, Condition, EntryNode, IndicatorRef};

#[derive(Debug, Clone, PartialEq)]
pub enum CacheBuildError {
    Indicator(String),
    UnknownIndicator(String),
}

impl std::fmt::Display for CacheBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indicator(msg) => write!(f, "indicator computation failed: {msg}"),
            Self::UnknownIndicator(name) => write!(f, "unknown indicator: {name}"),
        }
    }
}

impl std::error::Error for CacheBuildError {}

/// Longest lookback any leaf in `tree` requires, plus 2 (spec §4.6
/// "backfill history bars sufficient for the longest indicator period plus
/// 2"). Non-indicator leaves (comparators against `price`) require no
/// history, so they don't participate in this max.
pub fn required_history_bars(tree: &EntryNode) -> usize {
    let mut max_period: i64 = 0;
    for indicator in collect_indicators(tree) {
        if let Some(p) = indicator.params.iter().max() {
            max_period = max_period.max(*p);
        }
    }
    max_period.max(0) as usize + 2
}

fn collect_indicators(tree: &EntryNode) -> Vec<IndicatorRef> {
    fn walk(node: &EntryNode, out: &mut Vec<IndicatorRef>) {
        match node {
            EntryNode::Leaf { condition } => out.push(condition.indicator.clone()),
            EntryNode::AllOf { nodes } | EntryNode::AnyOf { nodes } => {
                for n in nodes {
                    walk(n, out);
                }
            }
        }
    }
    let mut out = Vec::new();
    walk(tree, &mut out);
    let mut seen: BTreeSet<String> = BTreeSet::new();
    out.into_iter().filter(|r| seen.insert(r.cache_key())).collect()
}

/// Rebuilds the full `IndicatorCache` from `bars` for every indicator the
/// tree references, plus the reserved OHLC series `bouncesFrom`/
/// `rejectsFrom` consult.
pub fn build_cache(bars: &[Bar], tree: &EntryNode, pip_size: f64) -> Result<IndicatorCache, CacheBuildError> {
    let mut cache = IndicatorCache::new(pip_size);

    cache.set("open", bars.iter().map(|b| Some(b.open)).collect());
    cache.set("high", bars.iter().map(|b| Some(b.high)).collect());
    cache.set("low", bars.iter().map(|b| Some(b.low)).collect());
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    cache.set("close", closes.iter().copied().map(Some).collect());

    for indicator in collect_indicators(tree) {
        let key = indicator.cache_key();
        let series = compute(&indicator, bars, &closes)?;
        cache.set(key, series);
    }

    Ok(cache)
}

fn compute(indicator: &IndicatorRef, bars: &[Bar], closes: &[f64]) -> Result<Vec<Option<f64>>, CacheBuildError> {
    let p = &indicator.params;
    let as_usize = |i: usize| -> usize { p.get(i).copied().unwrap_or(0).max(0) as usize };

    let map_err = |e: ind::IndicatorError| CacheBuildError::Indicator(e.to_string());

    match indicator.name.as_str() {
        "sma" => ind::sma(closes, as_usize(0)).map_err(map_err),
        "ema" => ind::ema(closes, as_usize(0)).map_err(map_err),
        "rsi" => ind::rsi(closes, as_usize(0)).map_err(map_err),
        "atr" => ind::atr(bars, as_usize(0)).map_err(map_err),
        "adx" => ind::adx(bars, as_usize(0)).map_err(map_err),
        "cci" => ind::cci(bars, as_usize(0)).map_err(map_err),
        "obv" => Ok(ind::obv(bars)),
        "sar" => ind::sar(
            bars,
            ind::SarParams {
                step: p.first().map(|v| *v as f64 / 100.0).unwrap_or(0.02),
                max: p.get(1).map(|v| *v as f64 / 100.0).unwrap_or(0.2),
            },
        )
        .map_err(map_err),
        "bollinger_upper" => ind::bollinger(closes, as_usize(0), p.get(1).copied().unwrap_or(2) as f64)
            .map(|b| b.upper)
            .map_err(map_err),
        "bollinger_lower" => ind::bollinger(closes, as_usize(0), p.get(1).copied().unwrap_or(2) as f64)
            .map(|b| b.lower)
            .map_err(map_err),
        "bollinger_middle" => ind::bollinger(closes, as_usize(0), p.get(1).copied().unwrap_or(2) as f64)
            .map(|b| b.middle)
            .map_err(map_err),
        "macd_line" => ind::macd(closes, as_usize(0), as_usize(1), as_usize(2))
            .map(|m| m.macd_line)
            .map_err(map_err),
        "macd_signal" => ind::macd(closes, as_usize(0), as_usize(1), as_usize(2))
            .map(|m| m.signal_line)
            .map_err(map_err),
        "macd_histogram" => ind::macd(closes, as_usize(0), as_usize(1), as_usize(2))
            .map(|m| m.histogram)
            .map_err(map_err),
        "stochastic_k" => ind::stochastic(bars, as_usize(0), as_usize(1), as_usize(2))
            .map(|s| s.k)
            .map_err(map_err),
        "stochastic_d" => ind::stochastic(bars, as_usize(0), as_usize(1), as_usize(2))
            .map(|s| s.d)
            .map_err(map_err),
        other => Err(CacheBuildError::UnknownIndicator(other.to_string())),
    }
}

/// Convenience used by warm-up checks: whether `cache` has a defined value
/// at `last_index` for every leaf `condition` in `tree`.
pub fn all_leaves_warm(tree: &EntryNode, cache: &IndicatorCache, last_index: usize) -> bool {
    fn walk(node: &EntryNode, cache: &IndicatorCache, idx: usize) -> bool {
        match node {
            EntryNode::Leaf { condition } => leaf_warm(condition, cache, idx),
            EntryNode::AllOf { nodes } | EntryNode::AnyOf { nodes } => {
                nodes.iter().all(|n| walk(n, cache, idx))
            }
        }
    }
    walk(tree, cache, last_index)
}

fn leaf_warm(condition: &Condition, cache: &IndicatorCache, idx: usize) -> bool {
    cache.value_at(&condition.indicator.cache_key(), idx).is_some()
}
