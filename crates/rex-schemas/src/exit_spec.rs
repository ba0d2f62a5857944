use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StopLossKind {
    Pips { value: f64 },
    Percent { value: f64 },
    Atr { atr_multiplier: f64 },
    EmaRef { period: u32 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StopLossSpec {
    #[serde(flatten)]
    pub kind: StopLossKind,
    pub min_pips: Option<f64>,
    pub max_pips: Option<f64>,
    pub max_holding_minutes: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TakeProfitSpec {
    Pips { value: f64 },
    Percent { value: f64 },
    Rr { value: f64 },
    Partial {
        rr_ratio: f64,
        levels: Vec<PartialLevel>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartialLevel {
    /// Fraction of `volumeOriginal` to close, in (0, 1].
    pub percentage: f64,
    /// RR at which this level triggers.
    pub at_rr: f64,
    #[serde(default)]
    pub move_stop_to_breakeven: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrailingDistance {
    Pips(f64),
    AtrMultiplier(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrailingSpec {
    pub enabled: bool,
    pub activate_at_rr: Option<f64>,
    pub distance: TrailingDistance,
    pub step_pips: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakevenSpec {
    /// Trigger as a multiple of the initial stop distance.
    pub trigger_ratio: f64,
    pub buffer_pips: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicTrailingSpec {
    pub base_pips: f64,
    pub atr_multiplier: f64,
}

/// "smartExit" flags, spec §3 ExitSpec.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SmartExitSpec {
    pub breakeven: Option<BreakevenSpec>,
    pub dynamic_trailing: Option<DynamicTrailingSpec>,
    pub regime_change_exit: bool,
    /// Minimum regime-detector confidence required to act on a regime change.
    pub regime_change_confidence_threshold: f64,
    pub session_close_auto_flatten: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExitSpec {
    pub stop_loss: Option<StopLossSpec>,
    pub take_profit: Option<TakeProfitSpec>,
    pub trailing: Option<TrailingSpec>,
    #[serde(default)]
    pub smart_exit: SmartExitSpec,
}

impl ExitSpec {
    /// `StrategyConfig` invariant (spec §3): at least one of stopLoss or
    /// maxHoldingTime must be defined. `maxHoldingMinutes` is carried as a
    /// field of `StopLossSpec`, so either sub-field satisfies the invariant.
    pub fn has_risk_bound(&self) -> bool {
        self.stop_loss.is_some()
    }
}
