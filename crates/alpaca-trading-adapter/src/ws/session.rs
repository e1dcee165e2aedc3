/*
[INPUT]:  Transport, credentials, handler slot and control channel
[OUTPUT]: One connection attempt: connect, authenticate, subscribe, stream
[POS]:    WebSocket layer - session state machine
[UPDATE]: When changing the connection lifecycle or protocol handshake
*/

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::http::Credentials;
use crate::ws::codec::{self, StreamClass};
use crate::ws::control::ControlChannel;
use crate::ws::dispatch::{DispatchRouter, HandlerSlot};
use crate::ws::logger::StreamLogger;
use crate::ws::transport::{Connection, Transport, TransportOptions};
use crate::ws::{StreamError, StreamResult};

/// Lifecycle state of the trading stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Authenticating,
    Subscribing,
    Streaming,
    Closing,
    Terminated,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Authenticating => "authenticating",
            SessionState::Subscribing => "subscribing",
            SessionState::Streaming => "streaming",
            SessionState::Closing => "closing",
            SessionState::Terminated => "terminated",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request forwarded from callers to the live session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Subscribe(StreamClass),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SupervisorStatus {
    NotStarted,
    Running,
    Finished,
}

/// State shared between callers and the driver task
pub(crate) struct SessionShared {
    pub(crate) control: ControlChannel,
    pub(crate) handlers: Arc<HandlerSlot>,
    running: AtomicBool,
    should_run: AtomicBool,
    state: watch::Sender<SessionState>,
    commands: Mutex<Option<mpsc::UnboundedSender<SessionCommand>>>,
    supervisor: Mutex<SupervisorStatus>,
}

impl SessionShared {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            control: ControlChannel::new(),
            handlers: Arc::new(HandlerSlot::new()),
            running: AtomicBool::new(false),
            should_run: AtomicBool::new(true),
            state,
            commands: Mutex::new(None),
            supervisor: Mutex::new(SupervisorStatus::NotStarted),
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub(crate) fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "trading stream state changed");
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub(crate) fn should_run(&self) -> bool {
        self.should_run.load(Ordering::SeqCst)
    }

    pub(crate) fn set_should_run(&self, should_run: bool) {
        self.should_run.store(should_run, Ordering::SeqCst);
    }

    pub(crate) fn supervisor(&self) -> SupervisorStatus {
        *self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the supervisor running and open a fresh command channel
    pub(crate) fn begin_run(&self) -> StreamResult<mpsc::UnboundedReceiver<SessionCommand>> {
        let mut supervisor = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *supervisor == SupervisorStatus::Running {
            return Err(StreamError::AlreadyRunning);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self
            .commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(tx);
        self.set_should_run(true);
        *supervisor = SupervisorStatus::Running;
        Ok(rx)
    }

    pub(crate) fn finish_run(&self) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.set_running(false);
        // A stop that raced the final shutdown must not leak into the next run.
        self.control.poll_stop();
        self.set_state(SessionState::Terminated);
        *self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = SupervisorStatus::Finished;
    }

    /// Forward a live subscription to the driver
    pub(crate) fn send_command(&self, command: SessionCommand) -> StreamResult<()> {
        let commands = self
            .commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let sender = commands.as_ref().ok_or_else(|| {
            StreamError::HandlerRegistration("session has no command channel".to_string())
        })?;
        sender.send(command).map_err(|_| {
            StreamError::HandlerRegistration("session driver is no longer receiving".to_string())
        })
    }
}

/// How a connection attempt ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionExit {
    Stopped,
}

enum Inbound {
    Frame(Vec<u8>),
    Command(SessionCommand),
    /// Bounded wait elapsed or a control signal woke the loop
    Idle,
}

/// Session parameters fixed for the stream's lifetime
#[derive(Debug, Clone)]
pub(crate) struct SessionParams {
    pub(crate) url: String,
    pub(crate) credentials: Credentials,
    pub(crate) options: TransportOptions,
    pub(crate) recv_timeout: Duration,
}

/// Drives connection attempts on behalf of the supervisor
pub(crate) struct Session<T: Transport> {
    transport: Arc<T>,
    params: SessionParams,
    shared: Arc<SessionShared>,
    router: DispatchRouter,
    logger: Arc<dyn StreamLogger>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    connection: Option<T::Connection>,
}

impl<T: Transport> Session<T> {
    pub(crate) fn new(
        transport: Arc<T>,
        params: SessionParams,
        shared: Arc<SessionShared>,
        router: DispatchRouter,
        logger: Arc<dyn StreamLogger>,
        commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Self {
        Self {
            transport,
            params,
            shared,
            router,
            logger,
            commands,
            connection: None,
        }
    }

    /// Run one attempt until a stop is consumed or an error ends it
    ///
    /// The caller must `close` afterwards in either case.
    pub(crate) async fn attempt(&mut self) -> StreamResult<SessionExit> {
        self.shared.set_state(SessionState::Connecting);
        self.logger.info("starting trading websocket connection");
        if self.connect().await?.is_some() {
            return Ok(SessionExit::Stopped);
        }

        self.shared.set_state(SessionState::Authenticating);
        if self.authenticate().await?.is_some() {
            return Ok(SessionExit::Stopped);
        }
        self.logger
            .info(&format!("connected to: {}", self.params.url));

        self.shared.set_state(SessionState::Subscribing);
        self.subscribe_registered().await?;

        self.shared.set_state(SessionState::Streaming);
        self.consume().await
    }

    /// Close the connection if one is open and clear `running`
    pub(crate) async fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if let Err(err) = connection.close().await {
                debug!(error = %err, "error while closing trading stream connection");
            }
        }
        self.shared.set_running(false);
    }

    async fn connect(&mut self) -> StreamResult<Option<SessionExit>> {
        let shared = self.shared.clone();
        let connection = tokio::select! {
            biased;
            _ = shared.control.notified() => {
                shared.control.poll_stop();
                return Ok(Some(SessionExit::Stopped));
            }
            connection = self.transport.connect(&self.params.url, &self.params.options) => connection?,
        };
        self.connection = Some(connection);
        self.shared.set_running(true);
        Ok(None)
    }

    async fn authenticate(&mut self) -> StreamResult<Option<SessionExit>> {
        let auth = codec::encode_auth(
            &self.params.credentials.api_key,
            &self.params.credentials.secret_key,
        );
        self.connection_mut()?.send(auth).await?;

        loop {
            if self.shared.control.poll_stop() {
                return Ok(Some(SessionExit::Stopped));
            }
            match self.next_inbound(false).await? {
                Inbound::Frame(raw) => {
                    let reply = codec::decode(&raw)?;
                    codec::check_authorized(&reply)?;
                    return Ok(None);
                }
                Inbound::Command(_) | Inbound::Idle => continue,
            }
        }
    }

    async fn subscribe_registered(&mut self) -> StreamResult<()> {
        let mut streams = self.shared.handlers.registered_streams();
        while let Ok(SessionCommand::Subscribe(class)) = self.commands.try_recv() {
            streams.insert(class);
        }
        self.send_subscribe(&streams).await
    }

    async fn send_subscribe(&mut self, streams: &BTreeSet<StreamClass>) -> StreamResult<()> {
        if streams.is_empty() {
            return Ok(());
        }
        let frame = codec::encode_subscribe(streams);
        self.connection_mut()?.send(frame).await?;
        debug!(streams = ?streams, "trading stream subscription sent");
        Ok(())
    }

    async fn consume(&mut self) -> StreamResult<SessionExit> {
        loop {
            if self.shared.control.poll_stop() {
                return Ok(SessionExit::Stopped);
            }
            match self.next_inbound(true).await? {
                Inbound::Frame(raw) => {
                    let frame = codec::decode(&raw)?;
                    self.router.dispatch(frame).await;
                }
                Inbound::Command(SessionCommand::Subscribe(class)) => {
                    self.send_subscribe(&BTreeSet::from([class])).await?;
                }
                Inbound::Idle => {}
            }
        }
    }

    /// Wait for one frame, a command or a control wake-up, bounded by `recv_timeout`
    async fn next_inbound(&mut self, accept_commands: bool) -> StreamResult<Inbound> {
        let recv_timeout = self.params.recv_timeout;
        let shared = self.shared.clone();
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| StreamError::transport("trading stream is not connected"))?;

        tokio::select! {
            biased;
            _ = shared.control.notified() => Ok(Inbound::Idle),
            Some(command) = self.commands.recv(), if accept_commands => Ok(Inbound::Command(command)),
            received = connection.recv(recv_timeout) => match received? {
                Some(raw) => Ok(Inbound::Frame(raw)),
                None => Ok(Inbound::Idle),
            },
        }
    }

    fn connection_mut(&mut self) -> StreamResult<&mut T::Connection> {
        self.connection
            .as_mut()
            .ok_or_else(|| StreamError::transport("trading stream is not connected"))
    }
}
