//! One Tokio task per running strategy (spec §4.6), generalized from the
//! teacher's `StrategyHost` (Tier-A: exactly one strategy, one timeframe,
//! shadow-gated intents) to one task per strategy id supervised by
//! `ExecutorCore`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use rex_broker::{BrokerClient, BrokerError, ModifyPositionRequest, OpenPositionRequest, PositionSnapshot};
use rex_conditions::{Regime, RegimeDetector, RegimeReading, ThresholdRegimeDetector};
use rex_exits::{ExitContext, PositionEvent, PositionRecord, StuckClosingAction, StuckClosingPolicy};
use rex_filters::{
    CorrelationFilter, Filter, FilterContext, FilterOutcome, FilterStack, NewsCalendar, NewsFilter,
    NullNewsCalendar, SessionFilter, SpreadFilter, VolatilityFilter,
};
use rex_portfolio::{DailyCounters, Micros};
use rex_risk::{self as risk, OpenPositionSummary, RiskInput};
use rex_schemas::{Command, CommandKind, EventKind, Side, StrategyConfig, TradeEvent};

use crate::cache_builder::{all_leaves_warm, build_cache, required_history_bars};
use crate::state::{RuntimeSnapshot, RuntimeState, RuntimeStats, RuntimeStatus};

/// Poll cadence (spec §4.6): jitter after expected bar close, and a fast
/// tick loop for exit management.
#[derive(Clone, Debug)]
pub struct PollCadence {
    pub jitter_secs: i64,
    pub tick_interval: Duration,
}

impl Default for PollCadence {
    fn default() -> Self {
        Self {
            jitter_secs: 2,
            tick_interval: Duration::from_millis(1000),
        }
    }
}

pub struct StrategyRuntime {
    id: String,
    state: RuntimeState,
    broker: Arc<dyn BrokerClient>,
    daily_counters: Arc<RwLock<DailyCounters>>,
    filter_stack: FilterStack,
    news_calendar: Arc<dyn NewsCalendar>,
    regime_detector: ThresholdRegimeDetector,
    cadence: PollCadence,
    mailbox: mpsc::Receiver<Command>,
    events_out: mpsc::UnboundedSender<TradeEvent>,
    handled_commands: HashSet<Uuid>,
    snapshot_tx: watch::Sender<RuntimeSnapshot>,
}

impl StrategyRuntime {
    /// Builds a runtime plus the `watch` channel `ExecutorCore` polls for
    /// `/api/strategies` listings — the only window into `RuntimeState`
    /// once `run` has taken ownership of `self`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: StrategyConfig,
        broker: Arc<dyn BrokerClient>,
        daily_counters: Arc<RwLock<DailyCounters>>,
        mailbox: mpsc::Receiver<Command>,
        events_out: mpsc::UnboundedSender<TradeEvent>,
        now: DateTime<Utc>,
    ) -> (Self, watch::Receiver<RuntimeSnapshot>) {
        let id = config.id.clone();
        let filter_stack = build_filter_stack(&config);
        let state = RuntimeState::new(config, now);
        let (snapshot_tx, snapshot_rx) = watch::channel(RuntimeSnapshot::from(&state));
        let runtime = Self {
            id,
            state,
            broker,
            daily_counters,
            filter_stack,
            news_calendar: Arc::new(NullNewsCalendar),
            regime_detector: ThresholdRegimeDetector::default(),
            cadence: PollCadence::default(),
            mailbox,
            events_out,
            handled_commands: HashSet::new(),
            snapshot_tx,
        };
        (runtime, snapshot_rx)
    }

    pub fn status(&self) -> RuntimeStatus {
        self.state.status
    }

    fn publish_snapshot(&self) {
        let _ = self.snapshot_tx.send(RuntimeSnapshot::from(&self.state));
    }

    /// Drives this strategy until it reaches `Stopped`. Consumes `self`:
    /// once a runtime stops, `ExecutorCore` drops the task and, if resumed,
    /// constructs a fresh one from persisted config (spec §4.7).
    pub async fn run(mut self) {
        self.state.status = RuntimeStatus::Starting;
        info!(strategy_id = %self.id, "strategy runtime starting");
        self.publish_snapshot();

        let mut ticker = tokio::time::interval(self.cadence.tick_interval);

        loop {
            if self.state.status == RuntimeStatus::Stopped {
                break;
            }

            let bar_wait = self.time_until_next_poll();

            tokio::select! {
                biased;

                cmd = self.mailbox.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            warn!(strategy_id = %self.id, "mailbox closed, stopping");
                            self.state.status = RuntimeStatus::Stopped;
                        }
                    }
                }

                _ = sleep(bar_wait) => {
                    self.on_bar_close().await;
                }

                _ = ticker.tick() => {
                    self.on_tick().await;
                }
            }

            self.publish_snapshot();
        }

        info!(strategy_id = %self.id, "strategy runtime stopped");
    }

    fn time_until_next_poll(&self) -> Duration {
        let now = Utc::now();
        if self.state.next_poll_due <= now {
            Duration::from_millis(0)
        } else {
            (self.state.next_poll_due - now)
                .to_std()
                .unwrap_or(Duration::from_millis(0))
        }
    }

    fn schedule_next_poll(&mut self) {
        let tf_secs = self.state.config.timeframe.seconds();
        let now = Utc::now();
        let epoch = now.timestamp();
        let next_boundary = ((epoch / tf_secs) + 1) * tf_secs;
        self.state.next_poll_due = DateTime::from_timestamp(next_boundary + self.cadence.jitter_secs, 0)
            .unwrap_or(now);
    }

    async fn handle_command(&mut self, cmd: Command) {
        if !self.handled_commands.insert(cmd.id) {
            debug!(strategy_id = %self.id, command_id = %cmd.id, "duplicate command ignored");
            return;
        }
        if cmd.is_expired(Utc::now()) {
            debug!(strategy_id = %self.id, command_id = %cmd.id, "expired command ignored");
            return;
        }

        match cmd.kind {
            CommandKind::Start => {
                if self.state.status != RuntimeStatus::Stopped {
                    self.state.status = RuntimeStatus::Starting;
                }
            }
            CommandKind::Pause => self.state.status = RuntimeStatus::Paused,
            CommandKind::Resume => {
                self.state.status = self.resume_status().await;
            }
            CommandKind::Stop => {
                self.state.status = RuntimeStatus::Stopping;
                self.state.status = RuntimeStatus::Stopped;
            }
            CommandKind::StopAndClose => {
                self.state.status = RuntimeStatus::Stopping;
                self.close_all_positions("commanded").await;
                self.state.status = RuntimeStatus::Stopped;
            }
            CommandKind::EmergencyStop => {
                self.close_all_positions("emergency_stop").await;
                self.state.status = RuntimeStatus::Stopped;
            }
            CommandKind::UpdateSettings => {
                if let Ok(new_config) = serde_json::from_value::<StrategyConfig>(cmd.payload.clone()) {
                    let id = self.state.config.id.clone();
                    self.state.config = StrategyConfig { id, ..new_config };
                    self.filter_stack = build_filter_stack(&self.state.config);
                } else {
                    warn!(strategy_id = %self.id, "UPDATE_SETTINGS payload did not parse as StrategyConfig");
                }
            }
            CommandKind::Ping => {}
        }
    }

    async fn close_all_positions(&mut self, reason: &str) {
        let tickets: Vec<String> = self.state.open_positions.keys().cloned().collect();
        for ticket in tickets {
            self.close_position_fully(&ticket, reason).await;
        }
    }

    async fn close_position_fully(&mut self, ticket: &str, reason: &str) {
        let Some(position) = self.state.open_positions.get_mut(ticket) else {
            return;
        };
        if position.apply(PositionEvent::CloseRequest, None).is_err() {
            return;
        }

        match self.broker.close_position(ticket, None).await {
            Ok(resp) => {
                if let Some(position) = self.state.open_positions.get_mut(ticket) {
                    let _ = position.apply(PositionEvent::CloseConfirm, None);
                }
                if let Some(position) = self.state.open_positions.remove(ticket) {
                    self.record_closed_trade(&position, resp.close_price, reason);
                }
            }
            Err(err) => self.handle_broker_error(err, "close_position"),
        }
    }

    fn record_closed_trade(&mut self, position: &PositionRecord, close_price: f64, reason: &str) {
        let pnl = position.side.sign() * (close_price - position.entry_price) * position.volume_remaining;
        let pnl_micros = Micros::from_f64(pnl);
        self.state.stats.trades += 1;
        self.state.stats.pnl_today = self.state.stats.pnl_today.saturating_add(pnl_micros);
        self.state.risk_state.record_trade_result(pnl_micros.raw() >= 0);
        if pnl_micros.is_negative() {
            self.state.stats.consecutive_losses += 1;
        } else {
            self.state.stats.consecutive_losses = 0;
        }

        self.emit(TradeEvent {
            event_kind: EventKind::Exit,
            strategy_id: self.id.clone(),
            symbol: position.symbol.clone(),
            ticket: position.ticket.clone(),
            side: position.side,
            volume: position.volume_remaining,
            price: close_price,
            time: Utc::now(),
            pnl_realized: Some(pnl),
            reason: reason.to_string(),
        });
    }

    fn emit(&self, event: TradeEvent) {
        let _ = self.events_out.send(event);
    }

    fn handle_broker_error(&mut self, err: BrokerError, op: &str) {
        match err {
            BrokerError::Retryable(msg) => {
                warn!(strategy_id = %self.id, op, %msg, "broker call retryable, will retry next cycle");
            }
            BrokerError::Rejected(msg) => {
                warn!(strategy_id = %self.id, op, %msg, "broker rejected request");
            }
            BrokerError::Fatal(msg) => {
                warn!(strategy_id = %self.id, op, %msg, "fatal broker error, pausing runtime");
                self.state.status = RuntimeStatus::Paused;
            }
        }
    }

    async fn on_bar_close(&mut self) {
        self.schedule_next_poll();

        let needed = required_history_bars(&self.state.config.entry_tree).max(50);
        let bars = match self
            .broker
            .bars(&self.state.config.symbol, self.state.config.timeframe, needed)
            .await
        {
            Ok(bars) => bars,
            Err(err) => {
                self.handle_broker_error(err, "bars");
                return;
            }
        };
        if bars.is_empty() {
            return;
        }

        self.state.last_bar = bars.last().cloned();
        self.state.bars = bars;

        match build_cache(&self.state.bars, &self.state.config.entry_tree, 0.0001) {
            Ok(cache) => self.state.indicator_cache = cache,
            Err(err) => {
                warn!(strategy_id = %self.id, %err, "indicator cache build failed");
                return;
            }
        }

        let last_index = self.state.bars.len() - 1;
        let warm = all_leaves_warm(&self.state.config.entry_tree, &self.state.indicator_cache, last_index);

        if self.state.status == RuntimeStatus::Starting {
            if warm {
                self.state.status = RuntimeStatus::Running;
                info!(strategy_id = %self.id, "warm-up complete, runtime running");
            } else {
                debug!(strategy_id = %self.id, "still warming up, retrying next bar");
                return;
            }
        }

        if !warm {
            return;
        }

        if matches!(
            self.state.status,
            RuntimeStatus::Paused | RuntimeStatus::Running
        ) {
            self.evaluate_entry(last_index).await;
        }
    }

    fn indicator_cache_is_warm(&self) -> bool {
        if self.state.bars.is_empty() {
            return false;
        }
        all_leaves_warm(
            &self.state.config.entry_tree,
            &self.state.indicator_cache,
            self.state.bars.len() - 1,
        )
    }

    /// Resolves a `Resume` command: refuses to arm on an un-warm cache or
    /// on any drift between broker-reported positions and what this
    /// runtime is tracking (spec §4.7 — a crash or a manual terminal
    /// action while paused must never be silently papered over by a
    /// resume).
    async fn resume_status(&mut self) -> RuntimeStatus {
        if !self.indicator_cache_is_warm() {
            return RuntimeStatus::Starting;
        }

        let broker_positions = match self.broker.list_positions(None).await {
            Ok(positions) => positions,
            Err(err) => {
                self.handle_broker_error(err, "list_positions");
                return RuntimeStatus::Paused;
            }
        };

        if self.positions_drifted(&broker_positions) {
            warn!(strategy_id = %self.id, "broker position drift detected on resume, staying paused");
            return RuntimeStatus::Paused;
        }

        RuntimeStatus::Running
    }

    /// `true` if the broker's view of this strategy's symbol disagrees
    /// with `self.state.open_positions` on either membership (a tracked
    /// ticket the broker no longer has, or a broker position this runtime
    /// never opened) or remaining volume.
    fn positions_drifted(&self, broker_positions: &[PositionSnapshot]) -> bool {
        let symbol = &self.state.config.symbol;
        let broker_by_ticket: HashMap<&str, &PositionSnapshot> = broker_positions
            .iter()
            .filter(|p| &p.symbol == symbol)
            .map(|p| (p.ticket.as_str(), p))
            .collect();

        if self.state.open_positions.len() != broker_by_ticket.len() {
            return true;
        }

        for (ticket, tracked) in &self.state.open_positions {
            match broker_by_ticket.get(ticket.as_str()) {
                Some(broker_position) => {
                    if (broker_position.volume - tracked.volume_remaining).abs() > 1e-6 {
                        return true;
                    }
                }
                None => return true,
            }
        }

        false
    }

    /// Estimates the stop distance in pips for sizing and take-profit
    /// placement (spec §4.4). `Atr`/`EmaRef` read the live series out of
    /// `indicator_cache` rather than guessing at a fixed multiplier.
    fn stop_distance_pips_estimate(
        &self,
        spec: &rex_schemas::StopLossSpec,
        last_index: usize,
        entry_price: f64,
        point_size: f64,
    ) -> Option<f64> {
        use rex_schemas::StopLossKind::*;
        match &spec.kind {
            Pips { value } => Some(*value),
            Percent { value } => Some(entry_price * value / 100.0 / point_size),
            Atr { atr_multiplier } => {
                let atr_period = self.state.config.filter_spec.volatility.atr_period;
                let atr_value = self
                    .state
                    .indicator_cache
                    .value_at(&format!("atr({atr_period})"), last_index)?;
                Some(atr_value / point_size * atr_multiplier)
            }
            EmaRef { period } => {
                let ema_value = self
                    .state
                    .indicator_cache
                    .value_at(&format!("ema({period})"), last_index)?;
                Some((entry_price - ema_value).abs() / point_size)
            }
        }
    }

    /// Classifies the current regime straight off the bar series so it does
    /// not depend on whether `entry_tree` happens to reference ADX/ATR
    /// (spec §4.5 responsibility 5).
    fn current_regime_reading(&self, last_index: usize) -> Option<RegimeReading> {
        let bars = &self.state.bars;
        if bars.is_empty() {
            return None;
        }
        let adx_period = 14;
        let atr_period = self.state.config.filter_spec.volatility.atr_period;
        let adx_series = rex_indicators::adx(bars, adx_period).ok()?;
        let atr_series = rex_indicators::atr(bars, atr_period).ok()?;
        let adx_value = adx_series.get(last_index).copied().flatten()?;
        let percentile = atr_percentile(&atr_series, last_index)?;
        let detector = ThresholdRegimeDetector::default();
        Some(detector.classify(adx_value, percentile))
    }

    async fn evaluate_entry(&mut self, last_index: usize) {
        let outcome = rex_conditions::evaluate(
            &self.state.config.entry_tree,
            &self.state.indicator_cache,
            last_index,
        );
        if !outcome.matched {
            return;
        }

        let symbol = self.state.config.symbol.clone();
        // Tier-A: one position per (strategy, symbol) at a time.
        if self.state.open_positions.values().any(|p| p.symbol == symbol) {
            return;
        }

        let side = infer_side(&outcome);

        if !self.state.status.may_open_new_entries() {
            debug!(strategy_id = %self.id, "paused: entry matched but shadowed, not executed");
            return;
        }

        let tick = match self.broker.tick(&symbol).await {
            Ok(t) => t,
            Err(err) => {
                self.handle_broker_error(err, "tick");
                return;
            }
        };
        let symbol_info = match self.broker.symbol_info(&symbol).await {
            Ok(s) => s,
            Err(err) => {
                self.handle_broker_error(err, "symbol_info");
                return;
            }
        };
        let account = match self.broker.account_info().await {
            Ok(a) => a,
            Err(err) => {
                self.handle_broker_error(err, "account_info");
                return;
            }
        };

        let entry_price = match side {
            Side::Buy => tick.ask,
            Side::Sell => tick.bid,
        };

        let candidate_log_returns = log_returns(&self.state.bars);
        let filter_ctx = FilterContext {
            now: Utc::now(),
            symbol: symbol.clone(),
            bid: tick.bid,
            ask: tick.ask,
            point_size: symbol_info.point_size,
            current_atr_pips: self
                .state
                .indicator_cache
                .value_at(&format!("atr({})", self.state.config.filter_spec.volatility.atr_period), last_index)
                .unwrap_or(0.0)
                / symbol_info.point_size,
            candidate_log_returns,
            open_symbol_log_returns: std::collections::HashMap::new(),
        };

        let filter_result = self.filter_stack.evaluate(&filter_ctx);
        let size_factor = match filter_result.outcome {
            FilterOutcome::Block(reason) => {
                debug!(strategy_id = %self.id, %reason, "entry blocked by filter stack");
                return;
            }
            FilterOutcome::ReduceSize(factor) => factor,
            FilterOutcome::Allow => 1.0,
        };

        let open_summaries: Vec<OpenPositionSummary> = self
            .state
            .open_positions
            .values()
            .map(|p| OpenPositionSummary {
                symbol: p.symbol.clone(),
                currencies: currency_legs(&p.symbol),
            })
            .collect();

        let today = Utc::now().date_naive();
        let daily = self
            .daily_counters
            .read()
            .await
            .snapshot_for_day(&self.id, today);

        let risk_input = RiskInput {
            symbol: symbol.clone(),
            symbol_currencies: currency_legs(&symbol),
            equity: Micros::from_f64(account.equity),
            balance: Micros::from_f64(account.balance),
            open_positions: open_summaries,
            daily,
            max_daily_loss: Micros::from_f64(self.state.config.risk_spec.max_daily_loss_ccy),
        };

        let decision = risk::evaluate(&self.state.config.risk_spec, &mut self.state.risk_state, &risk_input);
        if let rex_risk::RiskDecision::Block(reason) = decision {
            debug!(strategy_id = %self.id, %reason, "entry blocked by risk gate");
            return;
        }

        let stop_distance_pips = self
            .state
            .config
            .exit_spec
            .stop_loss
            .as_ref()
            .and_then(|s| self.stop_distance_pips_estimate(s, last_index, entry_price, symbol_info.point_size))
            .unwrap_or(20.0);

        let lots = risk::fixed_fractional(
            Micros::from_f64(account.equity),
            self.state.config.risk_spec.risk_percent_per_trade * size_factor,
            stop_distance_pips,
            symbol_info.tick_value,
            symbol_info.volume_step,
            symbol_info.volume_min,
            symbol_info.volume_max,
        );
        if lots.0 <= 0.0 {
            return;
        }

        let pip_value = symbol_info.point_size * 10.0;
        let stop_distance_price = stop_distance_pips * pip_value;
        let stop_loss = Some(entry_price - side.sign() * stop_distance_price);
        let take_profit = self.state.config.exit_spec.take_profit.as_ref().and_then(|spec| {
            take_profit_price(spec, entry_price, side, stop_distance_price, pip_value)
        });

        let regime_reading = self.current_regime_reading(last_index);

        let req = OpenPositionRequest {
            symbol: symbol.clone(),
            side,
            volume: lots.0,
            stop_loss,
            take_profit,
            comment: format!("rex:{}", self.id),
            magic: magic_for(&self.id),
        };

        match self.broker.open_position(req).await {
            Ok(resp) => {
                let mut position = PositionRecord::new(
                    resp.ticket.clone(),
                    symbol.clone(),
                    side,
                    resp.filled_price,
                    Utc::now(),
                    lots.0,
                    stop_loss,
                    take_profit,
                    stop_distance_price,
                );
                position.entry_regime = regime_reading.map(|r| r.regime);
                self.emit(TradeEvent {
                    event_kind: EventKind::Entry,
                    strategy_id: self.id.clone(),
                    symbol,
                    ticket: resp.ticket.clone(),
                    side,
                    volume: lots.0,
                    price: resp.filled_price,
                    time: Utc::now(),
                    pnl_realized: None,
                    reason: "entry_tree_matched".to_string(),
                });
                self.state.open_positions.insert(resp.ticket, position);
            }
            Err(err) => self.handle_broker_error(err, "open_position"),
        }
    }

    async fn on_tick(&mut self) {
        if self.state.open_positions.is_empty() {
            return;
        }

        let symbol = self.state.config.symbol.clone();
        let tick = match self.broker.tick(&symbol).await {
            Ok(t) => t,
            Err(err) => {
                self.handle_broker_error(err, "tick");
                return;
            }
        };

        let last_index = self.state.bars.len().saturating_sub(1);
        let atr = self.state.indicator_cache.value_at(
            &format!("atr({})", self.state.config.filter_spec.volatility.atr_period),
            last_index,
        );
        let regime_reading = self.current_regime_reading(last_index);

        let tickets: Vec<String> = self.state.open_positions.keys().cloned().collect();
        for ticket in tickets {
            self.evaluate_exit_for(&ticket, &tick, atr, regime_reading).await;
        }
    }

    async fn evaluate_exit_for(
        &mut self,
        ticket: &str,
        tick: &rex_broker::Tick,
        atr: Option<f64>,
        regime_reading: Option<RegimeReading>,
    ) {
        let Some(position) = self.state.open_positions.get(ticket) else {
            return;
        };

        if position.state == rex_exits::PositionState::Closing {
            let policy = self
                .state
                .stuck_closing
                .entry(ticket.to_string())
                .or_insert_with(StuckClosingPolicy::new);
            match policy.check(position, Utc::now()) {
                StuckClosingAction::Wait => return,
                StuckClosingAction::Retry => {
                    self.close_position_fully(ticket, "stuck_closing_retry").await;
                    return;
                }
                StuckClosingAction::Escalate => {
                    warn!(strategy_id = %self.id, ticket, "position stuck in Closing, escalating");
                    return;
                }
            }
        }

        let price = match position.side {
            Side::Buy => tick.bid,
            Side::Sell => tick.ask,
        };

        let unfavorable_regimes = position
            .entry_regime
            .map(all_regimes_except)
            .unwrap_or_default();

        let ctx = ExitContext {
            price,
            now: Utc::now(),
            atr,
            current_regime: regime_reading.map(|r| r.regime),
            unfavorable_regimes,
            regime_confidence: regime_reading.map(|r| r.confidence).unwrap_or(0.0),
            session_close_now: false,
        };

        let spec = self.state.config.exit_spec.clone();
        let Some(position) = self.state.open_positions.get_mut(ticket) else {
            return;
        };
        let decision = rex_exits::evaluate(position, &spec, &ctx);
        if decision.is_noop() {
            return;
        }

        if let Some(new_stop) = decision.modify_stop {
            if let Some(position) = self.state.open_positions.get_mut(ticket) {
                position.stop_loss = Some(new_stop);
            }
            if let Err(err) = self
                .broker
                .modify_position(
                    ticket,
                    ModifyPositionRequest {
                        stop_loss: Some(new_stop),
                        take_profit: None,
                    },
                )
                .await
            {
                self.handle_broker_error(err, "modify_position");
            }
        }

        for partial in decision.partial_closes {
            let Some((volume_remaining, side)) = self
                .state
                .open_positions
                .get(ticket)
                .map(|p| (p.volume_remaining, p.side))
            else {
                break;
            };
            let close_volume = volume_remaining * partial.fraction;
            match self.broker.close_position(ticket, Some(close_volume)).await {
                Ok(resp) => {
                    if let Some(position) = self.state.open_positions.get_mut(ticket) {
                        let _ = position.apply(PositionEvent::Partial, Some(&partial.level_id));
                        position.volume_remaining = (position.volume_remaining - resp.closed_volume).max(0.0);
                        if partial.move_stop_to_breakeven {
                            position.breakeven_moved = true;
                        }
                    }
                    self.emit(TradeEvent {
                        event_kind: EventKind::Partial,
                        strategy_id: self.id.clone(),
                        symbol: self.state.config.symbol.clone(),
                        ticket: ticket.to_string(),
                        side,
                        volume: resp.closed_volume,
                        price: resp.close_price,
                        time: Utc::now(),
                        pnl_realized: None,
                        reason: format!("partial:{}", partial.level_id),
                    });
                }
                Err(err) => self.handle_broker_error(err, "close_position"),
            }
        }

        if let Some(reason) = decision.full_close {
            self.close_position_fully(ticket, &reason.to_string()).await;
        }
    }
}

fn build_filter_stack(config: &StrategyConfig) -> FilterStack {
    let calendar: Arc<dyn NewsCalendar> = Arc::new(NullNewsCalendar);
    let filters: Vec<Box<dyn Filter>> = vec![
        Box::new(SessionFilter::new(config.filter_spec.session.clone())),
        Box::new(SpreadFilter::new(config.filter_spec.spread.clone())),
        Box::new(VolatilityFilter::new(config.filter_spec.volatility.clone())),
        Box::new(NewsFilter::new(config.filter_spec.news.clone(), calendar)),
        Box::new(CorrelationFilter::new(config.filter_spec.correlation.clone())),
    ];
    FilterStack::new(filters)
}

fn infer_side(outcome: &rex_conditions::EvalOutcome) -> Side {
    use rex_schemas::Comparator;
    for leaf in &outcome.matched_leaves {
        match leaf.comparator {
            Comparator::Gt | Comparator::CrossesAbove | Comparator::BouncesFrom => return Side::Buy,
            Comparator::Lt | Comparator::CrossesBelow | Comparator::RejectsFrom => return Side::Sell,
            Comparator::Eq => {}
        }
    }
    Side::Buy
}

fn currency_legs(symbol: &str) -> Vec<String> {
    if symbol.len() >= 6 {
        vec![symbol[0..3].to_string(), symbol[3..6].to_string()]
    } else {
        vec![symbol.to_string()]
    }
}

fn magic_for(strategy_id: &str) -> i64 {
    let mut hash: i64 = 0;
    for b in strategy_id.bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(b as i64);
    }
    hash.unsigned_abs() as i64 % 1_000_000
}

fn log_returns(bars: &[rex_schemas::Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| (w[1].close / w[0].close).ln())
        .collect()
}

/// Resolves a take-profit price for the non-partial kinds (spec §4.4/§8
/// S1). `Partial` has no single target price — `rex_exits::apply_partials`
/// owns that ladder instead, so it is intentionally left unhandled here.
fn take_profit_price(
    spec: &rex_schemas::TakeProfitSpec,
    entry_price: f64,
    side: Side,
    stop_distance_price: f64,
    pip_value: f64,
) -> Option<f64> {
    use rex_schemas::TakeProfitSpec::*;
    match spec {
        Pips { value } => Some(entry_price + side.sign() * value * pip_value),
        Percent { value } => Some(entry_price + side.sign() * entry_price * (value / 100.0)),
        Rr { value } => Some(entry_price + side.sign() * stop_distance_price * value),
        Partial { .. } => None,
    }
}

fn all_regimes_except(exclude: Regime) -> Vec<Regime> {
    [Regime::Trending, Regime::Ranging, Regime::Volatile, Regime::Quiet]
        .into_iter()
        .filter(|r| *r != exclude)
        .collect()
}

/// Fraction of the trailing window's ATR readings at or below the value at
/// `index`, the percentile input `ThresholdRegimeDetector` splits into
/// volatile/quiet/ranging.
fn atr_percentile(series: &[Option<f64>], index: usize) -> Option<f64> {
    let current = series.get(index).copied().flatten()?;
    let window_start = index.saturating_sub(99);
    let window: Vec<f64> = series[window_start..=index].iter().filter_map(|v| *v).collect();
    if window.len() < 2 {
        return None;
    }
    let below = window.iter().filter(|&&v| v <= current).count();
    Some(below as f64 / window.len() as f64)
}
