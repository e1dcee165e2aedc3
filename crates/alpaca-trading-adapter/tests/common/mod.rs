/*
[INPUT]:  Test configuration, scripted frames and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for alpaca-trading-adapter tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alpaca_trading_adapter::ws::{Connection, StreamError, StreamResult, Transport, TransportOptions};
use alpaca_trading_adapter::{Credentials, StreamConfig, StreamLogger};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;
use tokio::time::Instant;
use wiremock::MockServer;

/// Scripted frame that makes `recv` fail as if the socket dropped
pub const DISCONNECT: &str = "!disconnect";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn test_credentials() -> Credentials {
    Credentials::new("test-key-id", "test-secret-key").expect("credentials")
}

/// Stream config with short timings for tests
pub fn test_stream_config() -> StreamConfig {
    StreamConfig::new(test_credentials())
        .with_url_override("ws://scripted.invalid/stream")
        .with_handler_poll_interval(Duration::from_millis(10))
        .with_reconnect_delay(Duration::from_millis(10))
}

pub fn auth_reply(status: &str) -> String {
    json!({
        "stream": "authorization",
        "data": {"status": status, "action": "authenticate"}
    })
    .to_string()
}

pub fn trade_update_frame(data: Value) -> String {
    json!({"stream": "trade_updates", "data": data}).to_string()
}

pub fn order_json(order_id: &str, symbol: &str, status: &str) -> Value {
    json!({
        "id": order_id,
        "client_order_id": "a9b0d5f4-1c9e-4f34-8e0c-52cf1d4f0d11",
        "created_at": "2024-03-14T15:32:10.123456Z",
        "updated_at": "2024-03-14T15:32:11.654321Z",
        "submitted_at": "2024-03-14T15:32:10.200000Z",
        "filled_at": "2024-03-14T15:32:11.654321Z",
        "asset_id": "b0b6dd9d-8b9b-48a9-ba46-b9d54906e415",
        "symbol": symbol,
        "asset_class": "us_equity",
        "notional": null,
        "qty": "10",
        "filled_qty": "10",
        "filled_avg_price": "172.45",
        "order_class": "",
        "type": "market",
        "side": "buy",
        "time_in_force": "day",
        "limit_price": null,
        "stop_price": null,
        "status": status,
        "extended_hours": false
    })
}

/// `data` of a fill event for 10 AAPL at 172.45
pub fn fill_update_json(order_id: &str) -> Value {
    json!({
        "event": "fill",
        "execution_id": "5f4ea0f6-3ec1-4c16-a0c0-2bb9e13c9a4b",
        "order": order_json(order_id, "AAPL", "filled"),
        "timestamp": "2024-03-14T15:32:11.654321Z",
        "position_qty": "10",
        "price": "172.45",
        "qty": "10"
    })
}

type ScriptFn = dyn Fn(usize) -> Option<Vec<String>> + Send + Sync;

#[derive(Default)]
struct ScriptState {
    connects: AtomicUsize,
    closes: AtomicUsize,
    sent: Mutex<Vec<(usize, String)>>,
    live: Mutex<VecDeque<Vec<u8>>>,
    live_notify: Notify,
}

/// In-memory transport replaying scripted frames per connection
///
/// The script maps the connection index to the frames it delivers, or
/// `None` to refuse the connection.
#[derive(Clone)]
pub struct ScriptedTransport {
    script: Arc<ScriptFn>,
    state: Arc<ScriptState>,
}

impl ScriptedTransport {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(usize) -> Option<Vec<String>> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            state: Arc::new(ScriptState::default()),
        }
    }

    /// Every connection replays the same frames
    pub fn repeating(frames: Vec<String>) -> Self {
        Self::new(move |_| Some(frames.clone()))
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Frames sent on every connection, tagged with the connection index
    pub fn sent(&self) -> Vec<(usize, String)> {
        self.state.sent.lock().expect("lock").clone()
    }

    /// Frames sent with the given `action`
    pub fn sent_actions(&self, action: &str) -> Vec<(usize, Value)> {
        self.sent()
            .into_iter()
            .filter_map(|(index, text)| {
                let value: Value = serde_json::from_str(&text).ok()?;
                (value["action"] == action).then_some((index, value))
            })
            .collect()
    }

    /// Deliver a frame to whichever connection is open
    pub fn push_frame(&self, text: impl Into<String>) {
        let text = text.into();
        self.state
            .live
            .lock()
            .expect("lock")
            .push_back(text.into_bytes());
        self.state.live_notify.notify_waiters();
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Connection = ScriptedConnection;

    async fn connect(
        &self,
        url: &str,
        _options: &TransportOptions,
    ) -> StreamResult<ScriptedConnection> {
        let index = self.state.connects.fetch_add(1, Ordering::SeqCst);
        let frames = (self.script)(index)
            .ok_or_else(|| StreamError::Transport(format!("connection to {url} refused")))?;
        Ok(ScriptedConnection {
            index,
            frames: frames.into_iter().collect(),
            state: self.state.clone(),
        })
    }
}

pub struct ScriptedConnection {
    index: usize,
    frames: VecDeque<String>,
    state: Arc<ScriptState>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send(&mut self, text: String) -> StreamResult<()> {
        self.state.sent.lock().expect("lock").push((self.index, text));
        Ok(())
    }

    async fn recv(&mut self, wait: Duration) -> StreamResult<Option<Vec<u8>>> {
        if let Some(frame) = self.frames.pop_front() {
            if frame == DISCONNECT {
                return Err(StreamError::Transport("scripted disconnect".to_string()));
            }
            return Ok(Some(frame.into_bytes()));
        }

        let deadline = Instant::now() + wait;
        loop {
            let notified = self.state.live_notify.notified();
            if let Some(frame) = self.state.live.lock().expect("lock").pop_front() {
                return Ok(Some(frame));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn close(&mut self) -> StreamResult<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Logger that keeps every message
#[derive(Default)]
pub struct RecordingLogger {
    infos: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().expect("lock").clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().expect("lock").clone()
    }
}

impl StreamLogger for RecordingLogger {
    fn info(&self, message: &str) {
        self.infos.lock().expect("lock").push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.lock().expect("lock").push(message.to_string());
    }
}

/// Poll `condition` until it holds or `limit` elapses
pub async fn wait_until<F>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
