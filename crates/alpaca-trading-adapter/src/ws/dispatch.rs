/*
[INPUT]:  Decoded frames and the registered trade-update handler
[OUTPUT]: Handler invocations with typed or raw trade updates
[POS]:    WebSocket layer - inbound frame routing
[UPDATE]: When adding new stream classes or handler kinds
*/

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::types::TradeUpdate;
use crate::ws::codec::{Frame, StreamClass};
use crate::ws::logger::StreamLogger;

/// Payload handed to the trade-update handler
#[derive(Debug, Clone, PartialEq)]
pub enum TradeUpdateEvent {
    /// Decoded trade update
    Typed(TradeUpdate),
    /// The frame's `data` document, untouched (raw mode)
    Raw(Value),
}

impl TradeUpdateEvent {
    pub fn as_typed(&self) -> Option<&TradeUpdate> {
        match self {
            TradeUpdateEvent::Typed(update) => Some(update),
            TradeUpdateEvent::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            TradeUpdateEvent::Raw(value) => Some(value),
            TradeUpdateEvent::Typed(_) => None,
        }
    }
}

/// Asynchronous receiver of trade updates
#[async_trait]
pub trait TradeUpdateHandler: Send + Sync + 'static {
    async fn on_trade_update(&self, event: TradeUpdateEvent);
}

#[async_trait]
impl<F, Fut> TradeUpdateHandler for F
where
    F: Fn(TradeUpdateEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_trade_update(&self, event: TradeUpdateEvent) {
        (self)(event).await
    }
}

/// At most one trade-update handler
#[derive(Default)]
pub struct HandlerSlot {
    trade_updates: RwLock<Option<Arc<dyn TradeUpdateHandler>>>,
}

impl HandlerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler, replacing any previous one
    pub fn set_trade_updates(&self, handler: Arc<dyn TradeUpdateHandler>) {
        let mut slot = self
            .trade_updates
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(handler);
    }

    pub fn trade_updates(&self) -> Option<Arc<dyn TradeUpdateHandler>> {
        self.trade_updates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.trade_updates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Stream classes with a registered handler
    pub fn registered_streams(&self) -> BTreeSet<StreamClass> {
        let mut streams = BTreeSet::new();
        if !self.is_empty() {
            streams.insert(StreamClass::TradeUpdates);
        }
        streams
    }
}

impl std::fmt::Debug for HandlerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSlot")
            .field("trade_updates", &!self.is_empty())
            .finish()
    }
}

/// Routes frames to the registered handler
pub struct DispatchRouter {
    handlers: Arc<HandlerSlot>,
    raw_data: bool,
    logger: Arc<dyn StreamLogger>,
}

impl DispatchRouter {
    pub fn new(handlers: Arc<HandlerSlot>, raw_data: bool, logger: Arc<dyn StreamLogger>) -> Self {
        Self {
            handlers,
            raw_data,
            logger,
        }
    }

    pub fn raw_data(&self) -> bool {
        self.raw_data
    }

    /// Deliver one frame; unknown stream classes are dropped
    pub async fn dispatch(&self, frame: Frame) {
        let Some(class) = frame.stream.as_deref().and_then(StreamClass::from_discriminator) else {
            debug!(stream = ?frame.stream, "ws frame without handler dropped");
            return;
        };

        match class {
            StreamClass::TradeUpdates => self.dispatch_trade_update(frame.data).await,
        }
    }

    async fn dispatch_trade_update(&self, data: Value) {
        let Some(handler) = self.handlers.trade_updates() else {
            debug!("trade update received before a handler was registered");
            return;
        };

        let event = if self.raw_data {
            TradeUpdateEvent::Raw(data)
        } else {
            match serde_json::from_value::<TradeUpdate>(data) {
                Ok(update) => TradeUpdateEvent::Typed(update),
                Err(err) => {
                    self.logger
                        .warn(&format!("dropping undecodable trade update: {err}"));
                    return;
                }
            }
        };

        handler.on_trade_update(event).await;
    }
}

impl std::fmt::Debug for DispatchRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchRouter")
            .field("handlers", &self.handlers)
            .field("raw_data", &self.raw_data)
            .finish()
    }
}
