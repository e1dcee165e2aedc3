/*
[INPUT]:  Stream configuration, credentials and a trade-update handler
[OUTPUT]: Supervised trading stream delivering trade updates until stopped
[POS]:    WebSocket layer - lifecycle supervisor and public entry point
[UPDATE]: When changing run/stop semantics or stream configuration
*/

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::http::Credentials;
use crate::types::Environment;
use crate::ws::codec::StreamClass;
use crate::ws::dispatch::{DispatchRouter, TradeUpdateHandler};
use crate::ws::logger::{StreamLogger, TracingLogger};
use crate::ws::session::{
    Session, SessionCommand, SessionExit, SessionParams, SessionShared, SessionState,
    SupervisorStatus,
};
use crate::ws::transport::{Transport, TransportOptions, WsTransport};
use crate::ws::{StreamError, StreamResult};

/// Trading stream endpoints
pub const TRADING_STREAM_PAPER_URL: &str = "wss://paper-api.alpaca.markets/stream";
pub const TRADING_STREAM_LIVE_URL: &str = "wss://api.alpaca.markets/stream";

/// Where the stream connects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEndpoint {
    Environment(Environment),
    Url(String),
}

impl StreamEndpoint {
    pub fn url(&self) -> &str {
        match self {
            StreamEndpoint::Environment(Environment::Paper) => TRADING_STREAM_PAPER_URL,
            StreamEndpoint::Environment(Environment::Live) => TRADING_STREAM_LIVE_URL,
            StreamEndpoint::Url(url) => url,
        }
    }
}

impl Default for StreamEndpoint {
    fn default() -> Self {
        StreamEndpoint::Environment(Environment::Paper)
    }
}

/// Trading stream configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub credentials: Credentials,
    pub endpoint: StreamEndpoint,
    /// Hand handlers the untouched `data` document instead of a `TradeUpdate`
    pub raw_data: bool,
    pub transport: TransportOptions,
    /// Bounded wait of a single read
    pub recv_timeout: Duration,
    /// How often the idle supervisor checks for a registered handler
    pub handler_poll_interval: Duration,
    /// Pause before reconnecting after a failed attempt
    pub reconnect_delay: Duration,
}

impl StreamConfig {
    /// Paper endpoint, typed updates, default transport options
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            endpoint: StreamEndpoint::default(),
            raw_data: false,
            transport: TransportOptions::default(),
            recv_timeout: Duration::from_secs(5),
            handler_poll_interval: Duration::from_millis(100),
            reconnect_delay: Duration::from_millis(10),
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.endpoint = StreamEndpoint::Environment(environment);
        self
    }

    /// Connect to `url` regardless of environment
    pub fn with_url_override(mut self, url: impl Into<String>) -> Self {
        self.endpoint = StreamEndpoint::Url(url.into());
        self
    }

    pub fn with_raw_data(mut self, raw_data: bool) -> Self {
        self.raw_data = raw_data;
        self
    }

    pub fn with_transport_options(mut self, options: TransportOptions) -> Self {
        self.transport = options;
        self
    }

    pub fn with_recv_timeout(mut self, recv_timeout: Duration) -> Self {
        self.recv_timeout = recv_timeout;
        self
    }

    pub fn with_handler_poll_interval(mut self, interval: Duration) -> Self {
        self.handler_poll_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn endpoint_url(&self) -> &str {
        self.endpoint.url()
    }
}

/// Streaming client for account trade updates
///
/// Share it behind an `Arc` to call [`TradingStream::stop`] or register
/// handlers from other tasks or threads while [`TradingStream::run_forever`]
/// drives the connection.
pub struct TradingStream<T: Transport = WsTransport> {
    config: StreamConfig,
    transport: Arc<T>,
    shared: Arc<SessionShared>,
    logger: Arc<dyn StreamLogger>,
}

impl TradingStream<WsTransport> {
    pub fn new(config: StreamConfig) -> Self {
        Self::with_transport(config, WsTransport)
    }
}

impl<T: Transport> TradingStream<T> {
    /// Create a stream over a custom transport
    pub fn with_transport(config: StreamConfig, transport: T) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            shared: Arc::new(SessionShared::new()),
            logger: Arc::new(TracingLogger),
        }
    }

    /// Replace the lifecycle log sink
    pub fn with_logger(mut self, logger: Arc<dyn StreamLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        self.config.endpoint_url()
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.shared.watch_state()
    }

    /// True while a connection is open
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Register the trade-update handler, replacing any previous one
    ///
    /// On a live connection the subscription is sent right away; otherwise it
    /// goes out once the next connection is established. A connection that
    /// closes before the live hand-off is treated the same as no connection.
    pub fn subscribe_trade_updates<H>(&self, handler: H) -> StreamResult<()>
    where
        H: TradeUpdateHandler,
    {
        self.shared.handlers.set_trade_updates(Arc::new(handler));
        if self.shared.is_running()
            && let Err(err) = self
                .shared
                .send_command(SessionCommand::Subscribe(StreamClass::TradeUpdates))
        {
            debug!(error = %err, "live subscription deferred to next connection");
        }
        Ok(())
    }

    /// Blocking entry point
    ///
    /// Builds a Tokio runtime and drives [`TradingStream::run_forever`] on it.
    /// Ctrl-C stops the stream cleanly. Must not be called from within a
    /// runtime.
    pub fn run(&self) -> StreamResult<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        runtime.block_on(async {
            let run = self.run_forever();
            tokio::pin!(run);

            tokio::select! {
                result = &mut run => result,
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            self.logger.info("keyboard interrupt, stopping trading stream");
                            self.stop_ws();
                        }
                        Err(err) => {
                            self.logger
                                .warn(&format!("unable to listen for ctrl-c: {err}"));
                        }
                    }
                    run.await
                }
            }
        })
    }

    /// Supervisor loop; returns once the stream has been stopped
    pub async fn run_forever(&self) -> StreamResult<()> {
        let commands = self.shared.begin_run()?;
        let _guard = RunGuard {
            shared: self.shared.as_ref(),
        };

        self.shared.set_state(SessionState::Idle);
        if !self.wait_for_handler().await {
            self.logger.info("trading stream stopped before a handler was registered");
            return Ok(());
        }
        self.logger.info("started trading stream");

        let router = DispatchRouter::new(
            self.shared.handlers.clone(),
            self.config.raw_data,
            self.logger.clone(),
        );
        let params = SessionParams {
            url: self.config.endpoint_url().to_string(),
            credentials: self.config.credentials.clone(),
            options: self.config.transport.clone(),
            recv_timeout: self.config.recv_timeout,
        };
        let mut session = Session::new(
            self.transport.clone(),
            params,
            self.shared.clone(),
            router,
            self.logger.clone(),
            commands,
        );

        loop {
            if !self.shared.should_run() {
                self.logger.info("trading stream stopped");
                return Ok(());
            }

            match session.attempt().await {
                Ok(SessionExit::Stopped) => {
                    self.shared.set_state(SessionState::Closing);
                    session.close().await;
                    self.shared.set_state(SessionState::Idle);
                }
                Err(err) => {
                    self.shared.set_state(SessionState::Closing);
                    session.close().await;
                    self.logger.warn(&format!(
                        "trading stream websocket error, restarting connection: {err}"
                    ));
                    if self.shared.should_run() {
                        tokio::time::sleep(self.config.reconnect_delay).await;
                    }
                }
            }
        }
    }

    /// Stop a running supervisor
    ///
    /// Fails with [`StreamError::SupervisorNotRunning`] before `run` has
    /// started; a no-op once the supervisor has finished.
    pub fn stop(&self) -> StreamResult<()> {
        match self.shared.supervisor() {
            SupervisorStatus::NotStarted => Err(StreamError::SupervisorNotRunning),
            SupervisorStatus::Running => {
                self.stop_ws();
                Ok(())
            }
            SupervisorStatus::Finished => Ok(()),
        }
    }

    /// Clear `should_run` and enqueue a stop signal
    pub fn stop_ws(&self) {
        self.shared.set_should_run(false);
        self.shared.control.request_stop();
    }

    /// Poll for a handler; false when a stop arrives first
    async fn wait_for_handler(&self) -> bool {
        loop {
            if self.shared.control.poll_stop() {
                return false;
            }
            if !self.shared.handlers.is_empty() {
                return true;
            }
            tokio::select! {
                _ = self.shared.control.notified() => {}
                _ = tokio::time::sleep(self.config.handler_poll_interval) => {}
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for TradingStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingStream")
            .field("endpoint", &self.endpoint())
            .field("raw_data", &self.config.raw_data)
            .field("state", &self.state())
            .finish()
    }
}

/// Marks the supervisor finished however `run_forever` exits
struct RunGuard<'a> {
    shared: &'a SessionShared,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.shared.finish_run();
    }
}
