//! rex-exits — ExitManager (spec §4.5)
//!
//! Per-position lifecycle state machine plus the ordered exit evaluation
//! (breakeven, partials, trailing, time/regime/session) that produces one
//! coalesced `ExitDecision` per tick.

mod decision;
mod manager;
mod position;
mod stuck_closing;

pub use decision::{CloseReason, ExitDecision, PartialCloseAction};
pub use manager::{evaluate, ExitContext};
pub use position::{PartialExecution, PositionEvent, PositionRecord, PositionState, TransitionError};
pub use stuck_closing::{StuckClosingAction, StuckClosingPolicy};
