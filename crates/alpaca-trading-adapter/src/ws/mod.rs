/*
[INPUT]:  Stream configuration, credentials and trade-update handlers
[OUTPUT]: Real-time trade updates for the account
[POS]:    WebSocket layer - trading stream
[UPDATE]: When adding new stream classes or changing connection logic
*/

pub mod codec;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod logger;
pub mod session;
pub mod stream;
pub mod transport;

pub use codec::{Frame, StreamClass, check_authorized, decode, encode_auth, encode_subscribe};
pub use control::{ControlChannel, ControlSignal};
pub use dispatch::{DispatchRouter, HandlerSlot, TradeUpdateEvent, TradeUpdateHandler};
pub use error::{StreamError, StreamResult};
pub use logger::{StreamLogger, TracingLogger};
pub use session::{SessionCommand, SessionState};
pub use stream::{
    StreamConfig, StreamEndpoint, TRADING_STREAM_LIVE_URL, TRADING_STREAM_PAPER_URL,
    TradingStream,
};
pub use transport::{Connection, Transport, TransportOptions, WsConnection, WsTransport};
