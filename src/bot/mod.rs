pub mod sync;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::broker::{BridgeClient, Timeframe};
use crate::config::Config;
use crate::error::{BotError, Result};
use crate::execution::Executor;
use crate::models::{
    BotStatus, Direction, TradeIntent, TradeRecord, TradeSource, TradeStatus,
};
use crate::risk::{self, CooldownGate};
use crate::strategy::{confirm, TrendDetector};

const TREND_CANDLES: usize = 50;
const CONFIRMATION_CANDLES: usize = 3;

/// Mutable bot state, shared between the polling loop and the HTTP
/// handlers. Always behind the controller's mutex.
#[derive(Debug)]
pub struct BotState {
    pub status: BotStatus,
    pub current_direction: Option<Direction>,
    pub trades_executed: u64,
    pub last_trade: Option<TradeIntent>,
    pub error: Option<String>,
    pub trades: Vec<TradeRecord>,
}

impl Default for BotState {
    fn default() -> Self {
        Self {
            status: BotStatus::Stopped,
            current_direction: None,
            trades_executed: 0,
            last_trade: None,
            error: None,
            trades: Vec::new(),
        }
    }
}

/// What `GET /status` reports
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub status: BotStatus,
    pub trades_executed: u64,
    pub current_direction: Option<Direction>,
    pub last_trade: Option<TradeIntent>,
    pub error: Option<String>,
}

/// Owns the bot state and the polling loop task.
///
/// `start`/`stop` are idempotent-guarded; the loop is stopped through a
/// watch channel that the sleeps race against, so a stop request takes
/// effect immediately instead of at the end of a sleep.
pub struct Controller {
    state: Mutex<BotState>,
    broker: BridgeClient,
    config: Config,
    detector: TrendDetector,
    executor: Executor,
    connected: AtomicBool,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl Controller {
    pub fn new(broker: BridgeClient, config: Config) -> Self {
        let executor = Executor::new(broker.clone(), config.symbol.clone(), config.lot);
        Self {
            state: Mutex::new(BotState::default()),
            broker,
            config,
            detector: TrendDetector::default(),
            executor,
            connected: AtomicBool::new(false),
            stop_tx: Mutex::new(None),
        }
    }

    pub fn status(&self) -> StatusView {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        StatusView {
            status: state.status,
            trades_executed: state.trades_executed,
            current_direction: state.current_direction,
            last_trade: state.last_trade.clone(),
            error: state.error.clone(),
        }
    }

    /// Start the bot: connect the terminal if needed, then spawn the
    /// polling loop. Rejected when already running; on connection failure
    /// the bot stays stopped.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if self.is_running() {
            return Err(BotError::AlreadyRunning);
        }

        if !self.connected.load(Ordering::SeqCst) {
            self.broker.connect(&self.config.credentials).await?;
            self.connected.store(true, Ordering::SeqCst);
        }

        let stop_rx = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.status == BotStatus::Running {
                return Err(BotError::AlreadyRunning);
            }
            state.status = BotStatus::Running;
            state.error = None;

            let (tx, rx) = watch::channel(false);
            *self.stop_tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
            rx
        };

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.run_loop(stop_rx).await;
        });

        tracing::info!("📈 Trend bot started ({})", self.config.symbol);
        Ok(())
    }

    /// Stop the bot. Rejected when already stopped.
    pub fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.status == BotStatus::Stopped {
            return Err(BotError::AlreadyStopped);
        }
        state.status = BotStatus::Stopped;
        drop(state);

        if let Some(tx) = self.stop_tx.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = tx.send(true);
        }

        tracing::info!("Trend bot stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).status == BotStatus::Running
    }

    async fn run_loop(&self, mut stop_rx: watch::Receiver<bool>) {
        tracing::info!("Polling loop started");
        let mut cooldown = CooldownGate::new(self.config.cooldown);

        loop {
            if *stop_rx.borrow() {
                break;
            }

            let delay = match self.run_iteration(&mut cooldown).await {
                Ok(()) => self.config.poll_interval,
                Err(e) => {
                    tracing::error!("Error in bot loop: {}", e);
                    self.record_error(&e);
                    self.config.error_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop_rx.changed() => break,
            }
        }

        tracing::info!("Polling loop exited");
    }

    /// One pass of the state machine: signal, cooldown, confirmation,
    /// sizing, execution. A data error on the trend fetch degrades to "no
    /// direction"; everything else bubbles up to the backoff path.
    async fn run_iteration(&self, cooldown: &mut CooldownGate) -> Result<()> {
        let now = Utc::now();

        let direction = match self
            .broker
            .fetch_candles(&self.config.symbol, Timeframe::M15, TREND_CANDLES)
            .await
        {
            Ok(candles) => self.detector.direction(&candles),
            Err(e) => {
                tracing::warn!("Trend data unavailable: {}", e);
                None
            }
        };

        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.current_direction = direction;
        }
        tracing::info!(
            "Trend direction (15m): {}",
            direction.map(|d| d.as_str()).unwrap_or("none")
        );

        let Some(direction) = direction else {
            return Ok(());
        };

        if !cooldown.ready(now) {
            tracing::info!("⏳ Waiting for cooldown...");
            return Ok(());
        }

        let candles = self
            .broker
            .fetch_candles(&self.config.symbol, Timeframe::M5, CONFIRMATION_CANDLES)
            .await?;
        let Some(confirmation) = confirm(direction, &candles) else {
            tracing::debug!("No 5m confirmation for {}", direction.as_str());
            return Ok(());
        };
        tracing::info!(
            "Confirmation: entry={}, stop={}",
            confirmation.entry,
            confirmation.stop
        );

        let bracket = risk::bracket(direction, confirmation.entry, confirmation.stop);

        match self.executor.place_order(direction, bracket).await {
            Ok(intent) => {
                self.record_fill(intent);
                cooldown.mark(now);
            }
            Err(e @ BotError::OrderRejected { .. }) => {
                // Rejection is absorbed here: cooldown stays open so the
                // next confirmed signal can retry without waiting.
                self.record_error(&e);
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }

    fn record_fill(&self, intent: TradeIntent) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.trades_executed += 1;
        let record = TradeRecord {
            id: format!("bot-{}", state.trades_executed),
            symbol: self.config.symbol.clone(),
            direction: intent.direction,
            entry_price: intent.entry,
            exit_price: None,
            quantity: self.config.lot,
            timestamp: intent.timestamp,
            status: TradeStatus::Open,
            source: TradeSource::Bot,
            ticket: None,
            current_price: None,
            profit: None,
            commission: None,
        };
        state.trades.push(record);
        state.last_trade = Some(intent);
    }

    fn record_error(&self, error: &BotError) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.error = Some(error.to_string());
    }

    /// Rebuild the merged trade list: keep still-open bot records, re-merge
    /// the terminal's open positions and closed deals, dedup by id. Broker
    /// errors degrade to an empty view of that side rather than failing the
    /// query.
    pub async fn trades(&self) -> Vec<TradeRecord> {
        let bot_open: Vec<TradeRecord> = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state
                .trades
                .iter()
                .filter(|t| t.source == TradeSource::Bot && t.status == TradeStatus::Open)
                .cloned()
                .collect()
        };

        let positions = match self.broker.fetch_positions().await {
            Ok(positions) => positions,
            Err(e) => {
                tracing::warn!("Error syncing MT5 positions: {}", e);
                Vec::new()
            }
        };
        let deals = match self.broker.fetch_deals(history_epoch()).await {
            Ok(deals) => deals,
            Err(e) => {
                tracing::warn!("Error syncing MT5 deals: {}", e);
                Vec::new()
            }
        };

        let merged = sync::merge_trades(bot_open, &positions, &deals);

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.trades = merged.clone();
        merged
    }

    /// Closed trades (terminal "out" deals) since the given time
    pub async fn trade_history(&self, since: Option<DateTime<Utc>>) -> Vec<TradeRecord> {
        let since = since.unwrap_or_else(history_epoch);
        match self.broker.fetch_deals(since).await {
            Ok(deals) => sync::closed_trades(&deals),
            Err(e) => {
                tracing::error!("Error fetching trade history: {}", e);
                Vec::new()
            }
        }
    }
}

fn history_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}
