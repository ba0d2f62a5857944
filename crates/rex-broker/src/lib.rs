mod client;
mod paper;
mod terminal;
mod types;

pub use client::BrokerClient;
pub use paper::PaperBroker;
pub use terminal::TerminalBroker;
pub use types::{
    AccountInfo, BrokerError, ClosePositionResponse, ModifyPositionRequest, OpenPositionRequest,
    OpenPositionResponse, PositionSnapshot, SymbolInfo, Tick,
};
