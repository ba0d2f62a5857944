//! rex-filters — FilterStack (spec §4.3)
//!
//! Ordered market-condition gates evaluated before RiskGate on every entry
//! candidate. Each filter is independent and side-effect free; `FilterStack`
//! owns the ordering and short-circuit/compose semantics.

mod context;
mod correlation;
mod news;
mod outcome;
mod session;
mod spread;
mod stack;
mod volatility;

pub use context::{FilterContext, NewsCalendar, NewsEvent, NullNewsCalendar};
pub use correlation::CorrelationFilter;
pub use news::NewsFilter;
pub use outcome::FilterOutcome;
pub use session::SessionFilter;
pub use spread::SpreadFilter;
pub use stack::{Filter, FilterStack, FilterStackResult};
pub use volatility::VolatilityFilter;
