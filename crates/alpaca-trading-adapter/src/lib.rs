/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Alpaca trading adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod http;
pub mod types;
pub mod ws;

// Re-export commonly used types from http
pub use http::{
    AlpacaClient,
    AlpacaError,
    Authorization,
    ClientConfig,
    Credentials,
    Result,
    RetryPolicy,
};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    SessionState,
    StreamConfig,
    StreamError,
    StreamLogger,
    TradeUpdateEvent,
    TradeUpdateHandler,
    TradingStream,
    TransportOptions,
};
