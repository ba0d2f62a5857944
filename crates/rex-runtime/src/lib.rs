mod core;
mod error;
mod handle;

pub use core::{DeleteOutcome, ExecutorCore};
pub use error::ExecutorError;
pub use handle::StrategyHandle;
