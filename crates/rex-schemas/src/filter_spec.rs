use serde::{Deserialize, Serialize};

use crate::risk_spec::{CorrelationGrouping, CorrelationSpec};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeekendAllowance {
    /// 0 = Sunday .. 6 = Saturday (UTC).
    pub weekday: u8,
    pub start_hour_utc: u8,
    pub end_hour_utc: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSpec {
    pub allowed_sessions: Vec<String>,
    #[serde(default)]
    pub weekend_mode: bool,
    #[serde(default)]
    pub weekend_allowances: Vec<WeekendAllowance>,
    /// Named "optimal" sub-windows used for reporting/quality scoring only;
    /// never blocking on their own.
    #[serde(default)]
    pub optimal_times: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpreadSpec {
    pub max_pips: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySpec {
    pub min_atr_pips: f64,
    pub max_atr_pips: f64,
    pub atr_period: u32,
    /// When the upper bound is exceeded: block outright, or allow at reduced size.
    #[serde(default)]
    pub block_above_max: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsImpact {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsSpec {
    pub pause_before_min: i64,
    pub pause_after_min: i64,
    pub impact_levels: Vec<NewsImpact>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrelationFilterSpec {
    pub enabled: bool,
    pub max_correlation: f64,
    pub lookback_period: u32,
    pub grouping: CorrelationGrouping,
    /// If `true`, reduce size instead of blocking when the limit is exceeded.
    #[serde(default)]
    pub reduce_size_instead: bool,
}

impl From<&CorrelationSpec> for CorrelationFilterSpec {
    fn from(c: &CorrelationSpec) -> Self {
        Self {
            enabled: c.enabled,
            max_correlation: c.max_pair,
            lookback_period: c.lookback_period,
            grouping: c.grouping,
            reduce_size_instead: false,
        }
    }
}

/// `{session, spread, volatility, news, correlation}` — spec §3 FilterSpec.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub session: SessionSpec,
    pub spread: SpreadSpec,
    pub volatility: VolatilitySpec,
    pub news: NewsSpec,
    pub correlation: CorrelationFilterSpec,
}
