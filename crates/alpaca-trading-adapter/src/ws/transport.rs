/*
[INPUT]:  Stream URL and transport options
[OUTPUT]: Live connection handles exchanging text frames
[POS]:    WebSocket layer - socket transport and keepalive
[UPDATE]: When changing socket options or connection handling
*/

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;

use crate::ws::{StreamError, StreamResult};

const OUTBOUND_CAPACITY: usize = 32;
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Socket options applied to every connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Interval between keepalive pings; `None` or zero disables keepalive
    pub ping_interval: Option<Duration>,
    /// Connection fails when a ping is unanswered this long
    pub ping_timeout: Duration,
    /// Inbound frames buffered before reads stall
    pub max_queue: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            ping_interval: Some(Duration::from_secs(10)),
            ping_timeout: Duration::from_secs(180),
            max_queue: 1024,
        }
    }
}

/// Opens connections to the stream endpoint
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;

    async fn connect(&self, url: &str, options: &TransportOptions)
    -> StreamResult<Self::Connection>;
}

/// One open connection
///
/// `recv` must be cancel safe: the session races it against control signals.
#[async_trait]
pub trait Connection: Send + 'static {
    async fn send(&mut self, text: String) -> StreamResult<()>;

    /// Next inbound frame, or `None` when `wait` elapses first
    async fn recv(&mut self, wait: Duration) -> StreamResult<Option<Vec<u8>>>;

    async fn close(&mut self) -> StreamResult<()>;
}

/// tokio-tungstenite transport
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    type Connection = WsConnection;

    async fn connect(&self, url: &str, options: &TransportOptions) -> StreamResult<WsConnection> {
        let (ws_stream, _response) = connect_async(url).await?;
        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<WsMessage>(OUTBOUND_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(options.max_queue.max(1));
        let keepalive = options.ping_interval.filter(|period| !period.is_zero());
        let ping_timeout = options.ping_timeout;
        let endpoint = url.to_string();

        let task = tokio::spawn(async move {
            let mut ping = keepalive.map(|period| {
                let mut ping = tokio::time::interval_at(Instant::now() + period, period);
                ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ping
            });
            let mut awaiting_pong: Option<Instant> = None;

            let failure = loop {
                tokio::select! {
                    outbound = outbound_rx.recv() => {
                        match outbound {
                            Some(message) => {
                                if let Err(err) = write.send(message).await {
                                    break Some(StreamError::from(err));
                                }
                            }
                            None => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                break None;
                            }
                        }
                    }
                    incoming = read.next() => {
                        let payload = match incoming {
                            Some(Ok(WsMessage::Text(text))) => text.as_bytes().to_vec(),
                            Some(Ok(WsMessage::Binary(bytes))) => bytes.to_vec(),
                            Some(Ok(WsMessage::Pong(_))) => {
                                awaiting_pong = None;
                                continue;
                            }
                            Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Frame(_))) => continue,
                            Some(Ok(WsMessage::Close(frame))) => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                let reason = frame
                                    .map(|frame| frame.reason.as_str().to_string())
                                    .unwrap_or_default();
                                break Some(StreamError::transport(format!(
                                    "connection closed by server: {reason}"
                                )));
                            }
                            Some(Err(err)) => break Some(StreamError::from(err)),
                            None => break Some(StreamError::transport("connection stream ended")),
                        };
                        if inbound_tx.send(Ok(payload)).await.is_err() {
                            break None;
                        }
                    }
                    _ = next_ping(&mut ping) => {
                        if let Some(sent_at) = awaiting_pong {
                            if sent_at.elapsed() >= ping_timeout {
                                break Some(StreamError::transport("keepalive ping timed out"));
                            }
                            continue;
                        }
                        if let Err(err) = write.send(WsMessage::Ping(Vec::new().into())).await {
                            break Some(StreamError::from(err));
                        }
                        awaiting_pong = Some(Instant::now());
                    }
                }
            };

            if let Some(err) = failure {
                debug!(endpoint = %endpoint, error = %err, "ws connection task failed");
                let _ = inbound_tx.send(Err(err)).await;
            } else {
                debug!(endpoint = %endpoint, "ws connection task finished");
            }
        });

        Ok(WsConnection {
            outbound_tx: Some(outbound_tx),
            inbound_rx,
            task,
        })
    }
}

/// Next keepalive tick; never resolves when keepalive is disabled
async fn next_ping(ping: &mut Option<Interval>) {
    match ping {
        Some(ping) => {
            ping.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Handle to a tokio-tungstenite connection task
#[derive(Debug)]
pub struct WsConnection {
    outbound_tx: Option<mpsc::Sender<WsMessage>>,
    inbound_rx: mpsc::Receiver<StreamResult<Vec<u8>>>,
    task: JoinHandle<()>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, text: String) -> StreamResult<()> {
        let sender = self
            .outbound_tx
            .as_ref()
            .ok_or_else(|| StreamError::transport("connection already closed"))?;
        sender
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|_| StreamError::transport("websocket send channel closed"))
    }

    async fn recv(&mut self, wait: Duration) -> StreamResult<Option<Vec<u8>>> {
        match tokio::time::timeout(wait, self.inbound_rx.recv()).await {
            Err(_elapsed) => Ok(None),
            Ok(Some(Ok(payload))) => Ok(Some(payload)),
            Ok(Some(Err(err))) => Err(err),
            Ok(None) => Err(StreamError::transport("connection closed")),
        }
    }

    async fn close(&mut self) -> StreamResult<()> {
        // Dropping the sender makes the task send a close frame and exit.
        self.outbound_tx.take();
        if tokio::time::timeout(CLOSE_TIMEOUT, &mut self.task).await.is_err() {
            self.task.abort();
        }
        Ok(())
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}
