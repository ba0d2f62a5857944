use std::collections::HashMap;

pub type Series = Vec<Option<f64>>;

/// Indicator and base-price series for a single strategy's poll cycle,
/// keyed by `IndicatorRef::cache_key()` (spec §4.2). Also carries the raw
/// OHLC series under the reserved keys `"open"`, `"high"`, `"low"`,
/// `"close"`, which `bouncesFrom`/`rejectsFrom` consult regardless of what
/// indicator a condition's leaf names for the touch check.
///
/// `mtf` is the secondary cache for multi-timeframe symbolic references
/// (`h1_high`, `d1_trend`, ...), populated by the caller from
/// higher-timeframe bars (spec §4.2, §4.5).
#[derive(Default)]
pub struct IndicatorCache {
    series: HashMap<String, Series>,
    mtf: HashMap<String, Series>,
    pip_size: f64,
}

impl IndicatorCache {
    pub fn new(pip_size: f64) -> Self {
        Self {
            series: HashMap::new(),
            mtf: HashMap::new(),
            pip_size,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, series: Series) {
        self.series.insert(key.into(), series);
    }

    pub fn set_mtf(&mut self, key: impl Into<String>, series: Series) {
        self.mtf.insert(key.into(), series);
    }

    pub fn get(&self, key: &str) -> Option<&Series> {
        self.series.get(key)
    }

    pub fn value_at(&self, key: &str, index: usize) -> Option<f64> {
        self.series.get(key).and_then(|s| s.get(index)).copied().flatten()
    }

    pub fn close_series(&self) -> Option<&Series> {
        self.series.get("close")
    }

    /// Resolves a symbolic RHS name against the primary cache, falling back
    /// to the multi-timeframe cache, with support for an arithmetic offset
    /// suffix in pips: `ema_200_minus_2pips`, `bollinger_upper_plus_5pips`.
    pub fn resolve_symbol(&self, name: &str, index: usize) -> Option<f64> {
        if let Some(value) = self.lookup(name, index) {
            return Some(value);
        }

        for (sep, sign) in [("_minus_", -1.0), ("_plus_", 1.0)] {
            if let Some(pos) = name.find(sep) {
                let base = &name[..pos];
                let rest = &name[pos + sep.len()..];
                let pips_str = rest.strip_suffix("pips")?;
                let pips: f64 = pips_str.parse().ok()?;
                let base_value = self.lookup(base, index)?;
                return Some(base_value + sign * pips * self.pip_size);
            }
        }

        None
    }

    fn lookup(&self, name: &str, index: usize) -> Option<f64> {
        self.series
            .get(name)
            .or_else(|| self.mtf.get(name))
            .and_then(|s| s.get(index))
            .copied()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_direct_symbol() {
        let mut cache = IndicatorCache::new(0.0001);
        cache.set("ema(200)", vec![Some(1.2345)]);
        cache.set("ema_200", vec![Some(1.2345)]);
        assert_eq!(cache.resolve_symbol("ema_200", 0), Some(1.2345));
    }

    #[test]
    fn resolves_pip_offset_symbol() {
        let mut cache = IndicatorCache::new(0.0001);
        cache.set("ema_200", vec![Some(1.2000)]);
        let v = cache.resolve_symbol("ema_200_minus_2pips", 0).unwrap();
        assert!((v - 1.1998).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_mtf_cache() {
        let mut cache = IndicatorCache::new(0.0001);
        cache.set_mtf("h1_high", vec![Some(1.3), Some(1.31)]);
        assert_eq!(cache.resolve_symbol("h1_high", 1), Some(1.31));
    }

    #[test]
    fn unresolved_symbol_is_none() {
        let cache = IndicatorCache::new(0.0001);
        assert_eq!(cache.resolve_symbol("unknown_thing", 0), None);
    }
}
