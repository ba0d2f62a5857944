//! HTTP + WebSocket `PlatformLink` adapter (spec §4.9).

use std::sync::Mutex;
use std::time::Duration as StdDuration;

use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use rex_schemas::{Command, StrategyConfig, TradeEvent};

use crate::backoff::Backoff;
use crate::circuit::CircuitBreaker;
use crate::outbox::Outbox;
use crate::types::{HeartbeatSnapshot, PlatformError};
use crate::ws;
use crate::PlatformLink;

const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_OPEN_SECONDS: i64 = 30;
const DEFAULT_OUTBOX_CAPACITY: usize = 256;

pub struct RestPlatformLink {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    breaker: Mutex<CircuitBreaker>,
    backoff: Backoff,
    outbox: Mutex<Outbox>,
    commands_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Command>>,
}

impl RestPlatformLink {
    /// Connects the outbound REST client and spawns the inbound command
    /// stream. `base_url` is an `http(s)://` origin; the WS command
    /// channel is derived from it.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let base_url = base_url.into();
        let api_key = api_key.into();

        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(10))
            .build()?;

        let ws_url = format!(
            "{}/ws/commands",
            base_url.replacen("https://", "wss://", 1).replacen("http://", "ws://", 1)
        );
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(ws::run_command_stream(ws_url, api_key.clone(), tx));

        Ok(Self {
            base_url,
            api_key,
            client,
            breaker: Mutex::new(CircuitBreaker::new(
                DEFAULT_FAILURE_THRESHOLD,
                ChronoDuration::seconds(DEFAULT_OPEN_SECONDS),
            )),
            backoff: Backoff::default(),
            outbox: Mutex::new(Outbox::new(DEFAULT_OUTBOX_CAPACITY)),
            commands_rx: tokio::sync::Mutex::new(rx),
        })
    }

    fn breaker_permits(&self) -> bool {
        self.breaker.lock().unwrap().poll(Utc::now()).is_permitted()
    }

    fn record_success(&self) {
        self.breaker.lock().unwrap().record_success();
    }

    fn record_failure(&self) {
        self.breaker.lock().unwrap().record_failure(Utc::now());
    }

    /// POSTs `body` to `path` with retry+backoff while the circuit is
    /// closed (or half-open). Returns `PlatformError::Rejected` on a 4xx
    /// response (no retry), `PlatformError::Queued` once retries are
    /// exhausted or the circuit is open.
    async fn post_with_retry<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), PlatformError> {
        if !self.breaker_permits() {
            return Err(PlatformError::Queued);
        }

        let url = format!("{}{path}", self.base_url);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            match outcome {
                Ok(resp) if resp.status().is_success() => {
                    self.record_success();
                    return Ok(());
                }
                Ok(resp) if resp.status().is_client_error() => {
                    let status = resp.status();
                    return Err(PlatformError::Rejected(format!("platform returned {status}")));
                }
                Ok(resp) => {
                    self.record_failure();
                    tracing::warn!(status = %resp.status(), attempt, "platform call failed, retrying");
                }
                Err(e) => {
                    self.record_failure();
                    tracing::warn!(error = %e, attempt, "platform call errored, retrying");
                }
            }

            match self.backoff.delay_for(attempt) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(PlatformError::Queued),
            }
        }
    }

    /// Retries whatever the outbox is holding. Call this whenever the
    /// circuit transitions back to permitting calls (e.g. from the
    /// heartbeat loop).
    pub async fn flush_outbox(&self) {
        let pending = {
            let mut outbox = self.outbox.lock().unwrap();
            if outbox.is_empty() {
                return;
            }
            outbox.drain()
        };
        for event in pending {
            if let Err(PlatformError::Queued) = self.post_with_retry("/trades", &event).await {
                self.outbox.lock().unwrap().push(event);
                break;
            }
        }
    }
}

#[async_trait::async_trait]
impl PlatformLink for RestPlatformLink {
    async fn next_command(&self) -> Option<Command> {
        self.commands_rx.lock().await.recv().await
    }

    async fn report_trade(&self, event: TradeEvent) -> Result<(), PlatformError> {
        match self.post_with_retry("/trades", &event).await {
            Err(PlatformError::Queued) => {
                self.outbox.lock().unwrap().push(event);
                Err(PlatformError::Queued)
            }
            other => other,
        }
    }

    async fn report_heartbeat(&self, snapshot: HeartbeatSnapshot) -> Result<(), PlatformError> {
        let result = self.post_with_retry("/heartbeat", &snapshot).await;
        if result.is_ok() {
            self.flush_outbox().await;
        }
        result
    }

    async fn fetch_strategy(&self, id: &str) -> Result<Option<StrategyConfig>, PlatformError> {
        if !self.breaker_permits() {
            return Err(PlatformError::Queued);
        }
        let url = format!("{}/strategies/{id}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await;

        match resp {
            Ok(r) if r.status().as_u16() == 404 => {
                self.record_success();
                Ok(None)
            }
            Ok(r) if r.status().is_success() => {
                self.record_success();
                r.json::<StrategyConfig>()
                    .await
                    .map(Some)
                    .map_err(|e| PlatformError::Rejected(format!("decode strategy: {e}")))
            }
            Ok(r) if r.status().is_client_error() => {
                Err(PlatformError::Rejected(format!("platform returned {}", r.status())))
            }
            _ => {
                self.record_failure();
                Err(PlatformError::Queued)
            }
        }
    }
}
