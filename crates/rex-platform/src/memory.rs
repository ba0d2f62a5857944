//! Deterministic in-memory `PlatformLink`, grounded on
//! `rex_broker::PaperBroker`'s shape: a `Mutex`-guarded fixture with no
//! network and no randomness, for `ExecutorCore` tests.

use std::sync::Mutex;

use tokio::sync::mpsc;

use rex_schemas::{Command, StrategyConfig, TradeEvent};

use crate::types::{HeartbeatSnapshot, PlatformError};
use crate::PlatformLink;

pub struct InMemoryPlatformLink {
    commands_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Command>>,
    commands_tx: mpsc::UnboundedSender<Command>,
    reported_trades: Mutex<Vec<TradeEvent>>,
    reported_heartbeats: Mutex<Vec<HeartbeatSnapshot>>,
    strategies: Mutex<std::collections::BTreeMap<String, StrategyConfig>>,
}

impl InMemoryPlatformLink {
    pub fn new() -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        Self {
            commands_rx: tokio::sync::Mutex::new(commands_rx),
            commands_tx,
            reported_trades: Mutex::new(Vec::new()),
            reported_heartbeats: Mutex::new(Vec::new()),
            strategies: Mutex::new(std::collections::BTreeMap::new()),
        }
    }

    /// Pushes a command onto the inbound queue, as if received from the
    /// platform.
    pub fn push_command(&self, command: Command) {
        let _ = self.commands_tx.send(command);
    }

    /// Registers a strategy config so `fetch_strategy` can return it.
    pub fn seed_strategy(&self, id: impl Into<String>, config: StrategyConfig) {
        self.strategies.lock().unwrap().insert(id.into(), config);
    }

    pub fn reported_trades(&self) -> Vec<TradeEvent> {
        self.reported_trades.lock().unwrap().clone()
    }

    pub fn reported_heartbeats(&self) -> Vec<HeartbeatSnapshot> {
        self.reported_heartbeats.lock().unwrap().clone()
    }
}

impl Default for InMemoryPlatformLink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PlatformLink for InMemoryPlatformLink {
    async fn next_command(&self) -> Option<Command> {
        self.commands_rx.lock().await.recv().await
    }

    async fn report_trade(&self, event: TradeEvent) -> Result<(), PlatformError> {
        self.reported_trades.lock().unwrap().push(event);
        Ok(())
    }

    async fn report_heartbeat(&self, snapshot: HeartbeatSnapshot) -> Result<(), PlatformError> {
        self.reported_heartbeats.lock().unwrap().push(snapshot);
        Ok(())
    }

    async fn fetch_strategy(&self, id: &str) -> Result<Option<StrategyConfig>, PlatformError> {
        Ok(self.strategies.lock().unwrap().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rex_schemas::{CommandKind, EventKind, Side};
    use uuid::Uuid;

    #[tokio::test]
    async fn pushed_commands_are_received_in_order() {
        let link = InMemoryPlatformLink::new();
        let cmd = Command {
            id: Uuid::new_v4(),
            kind: CommandKind::Ping,
            payload: serde_json::json!({}),
            created_at: Utc::now(),
            expires_at: None,
        };
        link.push_command(cmd.clone());
        let received = link.next_command().await.unwrap();
        assert_eq!(received.id, cmd.id);
    }

    #[tokio::test]
    async fn reported_trades_accumulate() {
        let link = InMemoryPlatformLink::new();
        let event = TradeEvent {
            event_kind: EventKind::Entry,
            strategy_id: "s1".into(),
            symbol: "EURUSD".into(),
            ticket: "1".into(),
            side: Side::Buy,
            volume: 0.1,
            price: 1.1,
            time: Utc::now(),
            pnl_realized: None,
            reason: "entry".into(),
        };
        link.report_trade(event.clone()).await.unwrap();
        assert_eq!(link.reported_trades(), vec![event]);
    }
}
