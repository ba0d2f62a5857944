use serde::{Deserialize, Serialize};

use crate::bar::Timeframe;
use crate::entry_tree::EntryNode;
use crate::exit_spec::ExitSpec;
use crate::filter_spec::FilterSpec;
use crate::risk_spec::RiskSpec;

/// Immutable blueprint authored on the platform (spec §3 StrategyConfig).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub entry_tree: EntryNode,
    pub exit_spec: ExitSpec,
    pub risk_spec: RiskSpec,
    pub filter_spec: FilterSpec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyConfigError {
    EmptyEntryTree,
    MissingRiskBound,
}

impl std::fmt::Display for StrategyConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEntryTree => write!(f, "entryTree must be non-empty"),
            Self::MissingRiskBound => {
                write!(f, "at least one of stopLoss or maxHoldingTime must be defined")
            }
        }
    }
}

impl std::error::Error for StrategyConfigError {}

impl StrategyConfig {
    /// Validates the invariants stated in spec §3: non-empty entry tree,
    /// and at least one risk bound (stop-loss or max holding time).
    pub fn validate(&self) -> Result<(), StrategyConfigError> {
        if !self.entry_tree.is_non_empty() {
            return Err(StrategyConfigError::EmptyEntryTree);
        }
        if !self.exit_spec.has_risk_bound() {
            return Err(StrategyConfigError::MissingRiskBound);
        }
        Ok(())
    }
}
