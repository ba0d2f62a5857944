//! rex-platform — PlatformLink (spec §4.9)
//!
//! Capability abstraction over command intake and trade/heartbeat
//! reporting to the platform. All outbound calls go through a retry +
//! exponential backoff loop guarded by a circuit breaker; unsent trade
//! events are buffered and retried once the circuit closes.

mod backoff;
mod circuit;
mod memory;
mod outbox;
mod rest;
mod types;
mod ws;

pub use backoff::Backoff;
pub use circuit::{CallDecision, CircuitBreaker, CircuitState};
pub use memory::InMemoryPlatformLink;
pub use outbox::Outbox;
pub use rest::RestPlatformLink;
pub use types::{HeartbeatSnapshot, PlatformError};

use async_trait::async_trait;
use rex_schemas::{Command, StrategyConfig, TradeEvent};

/// Capability surface `ExecutorCore` needs from the platform (spec §4.9).
#[async_trait]
pub trait PlatformLink: Send + Sync {
    /// Pulls the next inbound command, waiting if none is queued.
    /// Delivery is at-least-once; callers key idempotency off
    /// `Command.id`.
    async fn next_command(&self) -> Option<Command>;

    async fn report_trade(&self, event: TradeEvent) -> Result<(), PlatformError>;

    async fn report_heartbeat(&self, snapshot: HeartbeatSnapshot) -> Result<(), PlatformError>;

    /// Used to reconcile `UPDATE_SETTINGS` commands against the
    /// platform's canonical copy.
    async fn fetch_strategy(&self, id: &str) -> Result<Option<StrategyConfig>, PlatformError>;
}
