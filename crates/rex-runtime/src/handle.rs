use rex_schemas::Command;
use rex_strategy::RuntimeSnapshot;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Everything `ExecutorCore` needs to address a running `StrategyRuntime`
/// task without touching its private state (spec §4.7 "owns the mapping
/// strategyId -> runtime under a single writer discipline").
pub struct StrategyHandle {
    pub cmd_tx: mpsc::Sender<Command>,
    pub snapshot_rx: watch::Receiver<RuntimeSnapshot>,
    pub join: JoinHandle<()>,
}

impl StrategyHandle {
    pub fn snapshot(&self) -> RuntimeSnapshot {
        self.snapshot_rx.borrow().clone()
    }
}
