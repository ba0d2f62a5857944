#[derive(Clone, Debug, PartialEq)]
pub enum CloseReason {
    TakeProfit,
    TimeExit,
    RegimeChange,
    SessionClose,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TakeProfit => write!(f, "take profit reached"),
            Self::TimeExit => write!(f, "max holding time reached"),
            Self::RegimeChange => write!(f, "unfavorable regime change"),
            Self::SessionClose => write!(f, "session close flatten"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PartialCloseAction {
    pub level_id: String,
    pub fraction: f64,
    pub move_stop_to_breakeven: bool,
}

/// Everything `ExitManager::evaluate` decided to do on one tick (spec §4.5:
/// "any modification is coalesced into at most one BrokerClient.modify call
/// per tick; closes are separate calls").
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExitDecision {
    pub modify_stop: Option<f64>,
    pub partial_closes: Vec<PartialCloseAction>,
    pub full_close: Option<CloseReason>,
}

impl ExitDecision {
    pub fn is_noop(&self) -> bool {
        self.modify_stop.is_none() && self.partial_closes.is_empty() && self.full_close.is_none()
    }
}
