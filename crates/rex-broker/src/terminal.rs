//! Live adapter talking to a broker terminal bridge over HTTP (spec §4.8,
//! `brokerTerminalPath` in `ExecutorConfig`).
//!
//! Uses `reqwest::blocking` rather than the async client: the bridge process
//! this talks to is a thin local HTTP shim in front of a terminal SDK that is
//! itself synchronous, so there is nothing to gain from async I/O here. Calls
//! run through `tokio::task::block_in_place` so a blocking request never
//! stalls the runtime's other strategy tasks; this also sidesteps a panic
//! when `reqwest::blocking` drops its internal runtime inside an async
//! context.

use async_trait::async_trait;
use rex_schemas::{Bar, Timeframe};
use reqwest::blocking::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::client::BrokerClient;
use crate::types::{
    AccountInfo, BrokerError, ClosePositionResponse, ModifyPositionRequest, OpenPositionRequest,
    OpenPositionResponse, PositionSnapshot, SymbolInfo, Tick,
};

pub struct TerminalBroker {
    base_url: String,
    client: Client,
}

impl TerminalBroker {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BrokerError> {
        let url = format!("{}{}", self.base_url, path);
        tokio::task::block_in_place(|| {
            let resp = self
                .client
                .get(&url)
                .send()
                .map_err(|e| BrokerError::Retryable(e.to_string()))?;
            Self::handle_response(resp)
        })
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, BrokerError> {
        let url = format!("{}{}", self.base_url, path);
        tokio::task::block_in_place(|| {
            let resp = self
                .client
                .post(&url)
                .json(body)
                .send()
                .map_err(|e| BrokerError::Retryable(e.to_string()))?;
            Self::handle_response(resp)
        })
    }

    fn handle_response<T: DeserializeOwned>(resp: reqwest::blocking::Response) -> Result<T, BrokerError> {
        let status = resp.status();
        if status.is_success() {
            resp.json::<T>()
                .map_err(|e| BrokerError::Retryable(format!("decode response: {e}")))
        } else if status.as_u16() == 429 || status.is_server_error() {
            Err(BrokerError::Retryable(format!("terminal bridge returned {status}")))
        } else if status.as_u16() == 422 || status.as_u16() == 400 {
            Err(BrokerError::Rejected(format!("terminal bridge rejected request: {status}")))
        } else {
            Err(BrokerError::Fatal(format!("terminal bridge returned {status}")))
        }
    }
}

#[async_trait]
impl BrokerClient for TerminalBroker {
    async fn account_info(&self) -> Result<AccountInfo, BrokerError> {
        self.get("/account")
    }

    async fn symbol_info(&self, symbol: &str) -> Result<SymbolInfo, BrokerError> {
        self.get(&format!("/symbols/{symbol}"))
    }

    async fn bars(&self, symbol: &str, timeframe: Timeframe, count: usize) -> Result<Vec<Bar>, BrokerError> {
        let tf = serde_json::to_value(timeframe)
            .map_err(|e| BrokerError::Fatal(e.to_string()))?
            .as_str()
            .unwrap_or_default()
            .to_string();
        self.get(&format!("/bars/{symbol}?timeframe={tf}&count={count}"))
    }

    async fn tick(&self, symbol: &str) -> Result<Tick, BrokerError> {
        self.get(&format!("/ticks/{symbol}"))
    }

    async fn open_position(
        &self,
        req: OpenPositionRequest,
    ) -> Result<OpenPositionResponse, BrokerError> {
        self.post("/positions/open", &req)
    }

    async fn modify_position(
        &self,
        ticket: &str,
        req: ModifyPositionRequest,
    ) -> Result<(), BrokerError> {
        let _: serde_json::Value = self.post(&format!("/positions/{ticket}/modify"), &req)?;
        Ok(())
    }

    async fn close_position(
        &self,
        ticket: &str,
        volume: Option<f64>,
    ) -> Result<ClosePositionResponse, BrokerError> {
        self.post(&format!("/positions/{ticket}/close"), &serde_json::json!({ "volume": volume }))
    }

    async fn list_positions(&self, magic: Option<i64>) -> Result<Vec<PositionSnapshot>, BrokerError> {
        match magic {
            Some(m) => self.get(&format!("/positions?magic={m}")),
            None => self.get("/positions"),
        }
    }
}
