use crate::types::{
    AccountInfo, BrokerError, ClosePositionResponse, ModifyPositionRequest, OpenPositionRequest,
    OpenPositionResponse, PositionSnapshot, SymbolInfo, Tick,
};
use async_trait::async_trait;
use rex_schemas::{Bar, Timeframe};

/// Capability surface a strategy runtime needs from a broker (spec §4.8).
/// Implemented by [`crate::paper::PaperBroker`] for backtests/shadow mode and
/// by [`crate::terminal::TerminalBroker`] against a live terminal bridge.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn account_info(&self) -> Result<AccountInfo, BrokerError>;

    async fn symbol_info(&self, symbol: &str) -> Result<SymbolInfo, BrokerError>;

    async fn bars(&self, symbol: &str, timeframe: Timeframe, count: usize) -> Result<Vec<Bar>, BrokerError>;

    async fn tick(&self, symbol: &str) -> Result<Tick, BrokerError>;

    async fn open_position(
        &self,
        req: OpenPositionRequest,
    ) -> Result<OpenPositionResponse, BrokerError>;

    async fn modify_position(
        &self,
        ticket: &str,
        req: ModifyPositionRequest,
    ) -> Result<(), BrokerError>;

    async fn close_position(
        &self,
        ticket: &str,
        volume: Option<f64>,
    ) -> Result<ClosePositionResponse, BrokerError>;

    async fn list_positions(&self, magic: Option<i64>) -> Result<Vec<PositionSnapshot>, BrokerError>;
}
