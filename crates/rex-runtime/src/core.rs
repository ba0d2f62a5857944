//! ExecutorCore — top-level coordinator.
//!
//! Owns the `strategyId -> StrategyRuntime` map under single-writer
//! discipline, dispatches inbound `Command`s, persists `StrategyConfig`s,
//! and runs the heartbeat + command-ingestion supervisory loops, each a
//! `tokio::spawn`ed task reading off its own mailbox.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use rex_broker::{BrokerClient, PositionSnapshot};
use rex_db::TradeLogRow;
use rex_platform::{HeartbeatSnapshot, PlatformLink};
use rex_portfolio::DailyCounters;
use rex_schemas::{Command, CommandKind, StrategyConfig};
use rex_strategy::{RuntimeSnapshot, RuntimeStatus, StrategyRuntime};

use crate::error::ExecutorError;
use crate::handle::StrategyHandle;

const MAILBOX_CAPACITY: usize = 32;

/// Command-id idempotency window (spec §6, §8): a re-delivered command
/// id within this span is a no-op.
fn idempotency_window() -> chrono::Duration {
    chrono::Duration::minutes(10)
}

/// Result of a permanent-delete request (spec §6 `DELETE
/// .../permanent`).
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteOutcome {
    pub strategy_deleted: bool,
    pub trade_logs_deleted: u64,
    pub was_running: bool,
}

pub struct ExecutorCore {
    executor_id: String,
    broker: Arc<dyn BrokerClient>,
    platform: Arc<dyn PlatformLink>,
    db: SqlitePool,
    daily_counters: Arc<RwLock<DailyCounters>>,
    runtimes: RwLock<HashMap<String, StrategyHandle>>,
    recent_commands: RwLock<HashMap<Uuid, DateTime<Utc>>>,
    broker_connected: AtomicBool,
    platform_connected: AtomicBool,
    started_at: Instant,
}

impl ExecutorCore {
    pub fn new(
        executor_id: impl Into<String>,
        broker: Arc<dyn BrokerClient>,
        platform: Arc<dyn PlatformLink>,
        db: SqlitePool,
    ) -> Self {
        Self {
            executor_id: executor_id.into(),
            broker,
            platform,
            db,
            daily_counters: Arc::new(RwLock::new(DailyCounters::new())),
            runtimes: RwLock::new(HashMap::new()),
            recent_commands: RwLock::new(HashMap::new()),
            broker_connected: AtomicBool::new(true),
            platform_connected: AtomicBool::new(true),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn broker_connected(&self) -> bool {
        self.broker_connected.load(Ordering::Relaxed)
    }

    pub fn platform_connected(&self) -> bool {
        self.platform_connected.load(Ordering::Relaxed)
    }

    pub async fn active_runtime_count(&self) -> usize {
        self.runtimes.read().await.len()
    }

    // -----------------------------------------------------------------
    // Boot (spec §4.7: "begins them in paused until the operator
    // re-activates")
    // -----------------------------------------------------------------

    /// Reconstructs runtimes from persisted `StrategyConfig`s. Every
    /// reconstructed runtime starts `paused` regardless of what was
    /// persisted — a restart never resumes live trading on its own.
    pub async fn boot(&self) -> Result<(), ExecutorError> {
        let rows = rex_db::list_strategies(&self.db).await?;
        for row in rows {
            let config: StrategyConfig = serde_json::from_value(row.payload_json)
                .map_err(|e| ExecutorError::InvalidConfig(e.to_string()))?;
            self.spawn_runtime(config, RuntimeStatus::Paused).await;
            info!(strategy_id = %row.id, "reconstructed runtime, boots paused");
        }
        Ok(())
    }

    async fn spawn_runtime(&self, config: StrategyConfig, boot_status: RuntimeStatus) {
        let id = config.id.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (runtime, snapshot_rx) = StrategyRuntime::new(
            config,
            self.broker.clone(),
            self.daily_counters.clone(),
            cmd_rx,
            events_tx,
            Utc::now(),
        );

        let platform = self.platform.clone();
        let forward_id = id.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                if let Err(e) = platform.report_trade(event).await {
                    warn!(strategy_id = %forward_id, error = %e, "trade event report failed");
                }
            }
        });

        let join = tokio::spawn(runtime.run());

        if boot_status == RuntimeStatus::Paused {
            // PAUSE immediately after spawn — the runtime starts in
            // `Starting` by default; this forces the fail-closed boot
            // behavior before the first bar close could ever arm it.
            let _ = cmd_tx
                .send(Command {
                    id: Uuid::new_v4(),
                    kind: CommandKind::Pause,
                    payload: serde_json::json!({}),
                    created_at: Utc::now(),
                    expires_at: None,
                })
                .await;
        }

        self.runtimes.write().await.insert(
            id,
            StrategyHandle {
                cmd_tx,
                snapshot_rx,
                join,
            },
        );
    }

    // -----------------------------------------------------------------
    // Command dispatch (spec §4.7)
    // -----------------------------------------------------------------

    /// `POST /api/strategies/start` and inbound `START` commands. A
    /// duplicate id is a no-op (spec §8 idempotence law) — no new
    /// runtime, no re-persistence.
    pub async fn start_strategy(&self, config: StrategyConfig) -> Result<RuntimeSnapshot, ExecutorError> {
        config
            .validate()
            .map_err(|e| ExecutorError::InvalidConfig(e.to_string()))?;

        if let Some(handle) = self.runtimes.read().await.get(&config.id) {
            return Ok(handle.snapshot());
        }

        let payload = serde_json::to_value(&config).map_err(|e| ExecutorError::InvalidConfig(e.to_string()))?;
        let timeframe_str = serde_json::to_value(config.timeframe)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        rex_db::insert_strategy(&self.db, &config.id, &config.name, &config.symbol, &timeframe_str, &payload)
            .await?;

        let id = config.id.clone();
        self.spawn_runtime(config, RuntimeStatus::Starting).await;
        let runtimes = self.runtimes.read().await;
        Ok(runtimes
            .get(&id)
            .expect("just inserted by spawn_runtime")
            .snapshot())
    }

    /// Forwards a command to an existing runtime's mailbox. Returns
    /// `NotFound` without side effects for an unknown id (spec §8).
    pub async fn dispatch(&self, strategy_id: &str, command: Command) -> Result<(), ExecutorError> {
        let runtimes = self.runtimes.read().await;
        let handle = runtimes
            .get(strategy_id)
            .ok_or_else(|| ExecutorError::NotFound(strategy_id.to_string()))?;
        if handle.cmd_tx.send(command).await.is_err() {
            warn!(strategy_id, "runtime mailbox closed, command dropped");
        }
        Ok(())
    }

    /// `DELETE /api/strategies/{id}/permanent` (spec §6). Drops the
    /// runtime's mailbox sender (the task stops itself on its next
    /// select — the "mailbox closed" path in `StrategyRuntime::run`)
    /// then removes the persisted config and its trade logs.
    pub async fn delete_permanent(&self, strategy_id: &str) -> Result<DeleteOutcome, ExecutorError> {
        let was_running = {
            let mut runtimes = self.runtimes.write().await;
            match runtimes.remove(strategy_id) {
                Some(handle) => {
                    let running = handle.snapshot().status != RuntimeStatus::Stopped;
                    drop(handle);
                    running
                }
                None => false,
            }
        };

        let (strategy_deleted, trade_logs_deleted) =
            rex_db::delete_strategy_permanent(&self.db, strategy_id).await?;

        Ok(DeleteOutcome {
            strategy_deleted,
            trade_logs_deleted,
            was_running,
        })
    }

    /// `DELETE /api/strategies/batch` — per-id outcome, no early exit on
    /// an individual failure.
    pub async fn delete_batch(&self, ids: &[String]) -> Vec<(String, Result<DeleteOutcome, ExecutorError>)> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push((id.clone(), self.delete_permanent(id).await));
        }
        out
    }

    // -----------------------------------------------------------------
    // Queries (spec §6)
    // -----------------------------------------------------------------

    pub async fn list_strategies(&self) -> Vec<RuntimeSnapshot> {
        self.runtimes.read().await.values().map(|h| h.snapshot()).collect()
    }

    pub async fn available_strategies(&self) -> Result<Vec<StrategyConfig>, ExecutorError> {
        // Forwarded from PlatformLink (spec §6) — `fetch_strategy` takes
        // an id, so "available" means every persisted strategy's
        // platform-side canonical copy, falling back to the local copy
        // when the platform doesn't have (or reach) it.
        let rows = rex_db::list_strategies(&self.db).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let local: StrategyConfig = serde_json::from_value(row.payload_json)
                .map_err(|e| ExecutorError::InvalidConfig(e.to_string()))?;
            let config = match self.platform.fetch_strategy(&row.id).await {
                Ok(Some(remote)) => remote,
                _ => local,
            };
            out.push(config);
        }
        Ok(out)
    }

    pub async fn account_info(&self) -> anyhow::Result<rex_broker::AccountInfo> {
        Ok(self.broker.account_info().await?)
    }

    pub async fn open_positions(&self) -> anyhow::Result<Vec<PositionSnapshot>> {
        Ok(self.broker.list_positions(None).await?)
    }

    pub async fn trade_history(&self, strategy_id: Option<&str>) -> Result<Vec<TradeLogRow>, ExecutorError> {
        match strategy_id {
            Some(id) => Ok(rex_db::fetch_trade_logs(&self.db, id).await?),
            None => {
                let rows = rex_db::list_strategies(&self.db).await?;
                let mut all = Vec::new();
                for row in rows {
                    all.extend(rex_db::fetch_trade_logs(&self.db, &row.id).await?);
                }
                all.sort_by_key(|r| r.time);
                Ok(all)
            }
        }
    }

    // -----------------------------------------------------------------
    // Supervisory loops (spec §4.7, §5)
    // -----------------------------------------------------------------

    /// Runs forever, pulling commands from the platform and routing them
    /// to the right runtime (spawning one for `START`).
    pub async fn run_command_ingestion(self: Arc<Self>) {
        loop {
            let Some(command) = self.platform.next_command().await else {
                warn!("platform command stream closed, ingestion stopped");
                return;
            };
            if let Err(e) = self.handle_inbound(command).await {
                warn!(error = %e, "failed to handle inbound command");
            }
        }
    }

    /// `true` if this exact command id was already handled within the
    /// idempotency window (spec §6, §8 "re-delivering the same Command
    /// id ... is a no-op"), recording it as seen otherwise.
    async fn already_handled(&self, command_id: Uuid, now: DateTime<Utc>) -> bool {
        let mut recent = self.recent_commands.write().await;
        recent.retain(|_, seen_at| now.signed_duration_since(*seen_at) < idempotency_window());
        if recent.contains_key(&command_id) {
            return true;
        }
        recent.insert(command_id, now);
        false
    }

    async fn handle_inbound(&self, command: Command) -> Result<(), ExecutorError> {
        if self.already_handled(command.id, Utc::now()).await {
            info!(command_id = %command.id, "duplicate command id within idempotency window, ignoring");
            return Ok(());
        }
        match command.kind {
            CommandKind::Start => {
                let config: StrategyConfig = serde_json::from_value(command.payload.clone())
                    .map_err(|e| ExecutorError::InvalidConfig(e.to_string()))?;
                self.start_strategy(config).await?;
                Ok(())
            }
            CommandKind::UpdateSettings => {
                let config: StrategyConfig = serde_json::from_value(command.payload.clone())
                    .map_err(|e| ExecutorError::InvalidConfig(e.to_string()))?;
                self.dispatch(&config.id, command).await
            }
            _ => {
                let strategy_id = command
                    .payload
                    .get("strategyId")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| ExecutorError::InvalidConfig("missing strategyId in payload".into()))?
                    .to_string();
                self.dispatch(&strategy_id, command).await
            }
        }
    }

    /// Runs forever, publishing `{executorId, accountSummary,
    /// runtimeCount, openPositions}` every `interval` (spec §4.7).
    pub async fn run_heartbeat(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.publish_heartbeat().await;
        }
    }

    async fn publish_heartbeat(&self) {
        let account_summary = match self.broker.account_info().await {
            Ok(info) => {
                self.broker_connected.store(true, Ordering::Relaxed);
                info
            }
            Err(e) => {
                self.broker_connected.store(false, Ordering::Relaxed);
                warn!(error = %e, "heartbeat account_info failed");
                return;
            }
        };

        let open_positions = self.broker.list_positions(None).await.unwrap_or_default();
        let runtime_count = self.active_runtime_count().await;

        let snapshot = HeartbeatSnapshot {
            executor_id: self.executor_id.clone(),
            account_summary,
            runtime_count,
            open_positions,
            time: Utc::now(),
        };

        match self.platform.report_heartbeat(snapshot).await {
            Ok(()) => self.platform_connected.store(true, Ordering::Relaxed),
            Err(_) => self.platform_connected.store(false, Ordering::Relaxed),
        }
    }
}
