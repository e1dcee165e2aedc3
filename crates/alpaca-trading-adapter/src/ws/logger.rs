/*
[INPUT]:  Lifecycle messages from the stream supervisor and session
[OUTPUT]: Log records through an injected sink
[POS]:    WebSocket layer - logging collaborator
[UPDATE]: When changing how stream lifecycle events are reported
*/

use tracing::{info, warn};

/// Sink for stream lifecycle messages
pub trait StreamLogger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Forwards to `tracing` under the `alpaca_trading_adapter::ws` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl StreamLogger for TracingLogger {
    fn info(&self, message: &str) {
        info!(target: "alpaca_trading_adapter::ws", "{message}");
    }

    fn warn(&self, message: &str) {
        warn!(target: "alpaca_trading_adapter::ws", "{message}");
    }
}
