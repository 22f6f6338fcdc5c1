//! One long-lived bidirectional channel per session.
//!
//! Each channel is run by a supervisor task that connects through a
//! [`Transport`], pumps frames in both directions, and after an unexpected
//! closure waits a fixed delay before reconnecting. Reconnection never gives
//! up; the supervisor stops only when the session is closed through
//! [`ChannelManager::close`] or the manager is dropped.

pub mod websocket;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ClientFrame, ServerEvent};
use crate::core::session::SessionId;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Open,
    Closed,
    Error,
}

impl ChannelStatus {
    pub fn label(self) -> &'static str {
        match self {
            ChannelStatus::Connecting => "connecting",
            ChannelStatus::Open => "connected",
            ChannelStatus::Closed => "disconnected",
            ChannelStatus::Error => "connection error",
        }
    }
}

/// Notification delivered from a supervisor to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Status(ChannelStatus),
    Frame(ServerEvent),
}

#[derive(Debug)]
pub enum ChannelError {
    /// The transport could not establish a connection.
    Connect(String),
    /// Writing a frame failed.
    Send(String),
    /// Reading a frame failed.
    Receive(String),
    /// The peer closed the connection.
    Closed,
    /// A client frame could not be encoded.
    Encode(serde_json::Error),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Connect(reason) => write!(f, "failed to connect: {reason}"),
            ChannelError::Send(reason) => write!(f, "failed to send frame: {reason}"),
            ChannelError::Receive(reason) => write!(f, "failed to read frame: {reason}"),
            ChannelError::Closed => write!(f, "channel closed by peer"),
            ChannelError::Encode(source) => write!(f, "failed to encode frame: {source}"),
        }
    }
}

impl StdError for ChannelError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ChannelError::Encode(source) => Some(source),
            _ => None,
        }
    }
}

pub type FrameSink = Pin<Box<dyn Sink<String, Error = ChannelError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, ChannelError>> + Send>>;

/// An established connection split into its text-frame halves.
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, session_id: SessionId) -> Result<Connection, ChannelError>;
}

struct ChannelHandle {
    outbound: mpsc::UnboundedSender<ClientFrame>,
    status: watch::Receiver<ChannelStatus>,
    cancel: CancellationToken,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    fn is_alive(&self) -> bool {
        !self.task.is_finished() && !self.cancel.is_cancelled()
    }
}

pub type ChannelEventReceiver = mpsc::UnboundedReceiver<(SessionId, ChannelEvent)>;

pub struct ChannelManager {
    transport: Arc<dyn Transport>,
    events: mpsc::UnboundedSender<(SessionId, ChannelEvent)>,
    reconnect_delay: Duration,
    channels: HashMap<SessionId, ChannelHandle>,
}

impl ChannelManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        reconnect_delay: Duration,
    ) -> (Self, ChannelEventReceiver) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                transport,
                events,
                reconnect_delay,
                channels: HashMap::new(),
            },
            rx,
        )
    }

    /// Starts a supervisor for `session_id` unless a live one exists. A live
    /// supervisor that is waiting out its reconnect delay is woken so it
    /// retries immediately.
    pub fn ensure_open(&mut self, session_id: SessionId) {
        if let Some(handle) = self.channels.get(&session_id) {
            if handle.is_alive() {
                if matches!(handle.status(), ChannelStatus::Closed | ChannelStatus::Error) {
                    handle.wake.notify_one();
                }
                return;
            }
        }

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(ChannelStatus::Connecting);
        let cancel = CancellationToken::new();
        let wake = Arc::new(Notify::new());
        let supervisor = Supervisor {
            session_id,
            transport: Arc::clone(&self.transport),
            outbound: outbound_rx,
            status: status_tx,
            events: self.events.clone(),
            cancel: cancel.clone(),
            wake: Arc::clone(&wake),
            reconnect_delay: self.reconnect_delay,
        };
        let task = tokio::spawn(supervisor.run());

        if let Some(previous) = self.channels.insert(
            session_id,
            ChannelHandle {
                outbound,
                status,
                cancel,
                wake,
                task,
            },
        ) {
            previous.cancel.cancel();
        }
    }

    /// Queues `frame` for transmission. Returns `false`, without queueing,
    /// when the session has no open channel.
    pub fn send(&self, session_id: SessionId, frame: ClientFrame) -> bool {
        match self.channels.get(&session_id) {
            Some(handle) if handle.status() == ChannelStatus::Open => {
                handle.outbound.send(frame).is_ok()
            }
            _ => false,
        }
    }

    pub fn status(&self, session_id: SessionId) -> Option<ChannelStatus> {
        self.channels.get(&session_id).map(ChannelHandle::status)
    }

    pub fn is_open(&self, session_id: SessionId) -> bool {
        self.status(session_id) == Some(ChannelStatus::Open)
    }

    pub fn status_receiver(&self, session_id: SessionId) -> Option<watch::Receiver<ChannelStatus>> {
        self.channels
            .get(&session_id)
            .map(|handle| handle.status.clone())
    }

    /// Stops the supervisor and closes the connection. Any pending reconnect
    /// is cancelled.
    pub fn close(&mut self, session_id: SessionId) {
        if let Some(handle) = self.channels.remove(&session_id) {
            debug!(session = %session_id, "closing channel");
            handle.cancel.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        for handle in self.channels.values() {
            handle.cancel.cancel();
        }
    }
}

enum PumpExit {
    Cancelled,
    Closed,
    Failed(ChannelError),
}

struct Supervisor {
    session_id: SessionId,
    transport: Arc<dyn Transport>,
    outbound: mpsc::UnboundedReceiver<ClientFrame>,
    status: watch::Sender<ChannelStatus>,
    events: mpsc::UnboundedSender<(SessionId, ChannelEvent)>,
    cancel: CancellationToken,
    wake: Arc<Notify>,
    reconnect_delay: Duration,
}

impl Supervisor {
    async fn run(mut self) {
        loop {
            self.set_status(ChannelStatus::Connecting);
            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                result = self.transport.connect(self.session_id) => result,
            };

            match connected {
                Ok(connection) => {
                    info!(session = %self.session_id, "channel open");
                    self.set_status(ChannelStatus::Open);
                    match self.pump(connection).await {
                        PumpExit::Cancelled => return,
                        PumpExit::Closed => {
                            info!(session = %self.session_id, "channel closed");
                            self.set_status(ChannelStatus::Closed);
                        }
                        PumpExit::Failed(err) => {
                            warn!(session = %self.session_id, error = %err, "channel failed");
                            self.set_status(ChannelStatus::Error);
                        }
                    }
                }
                Err(err) => {
                    warn!(session = %self.session_id, error = %err, "channel connect failed");
                    self.set_status(ChannelStatus::Error);
                }
            }

            debug!(
                session = %self.session_id,
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "scheduling reconnect"
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = self.wake.notified() => {}
            }
        }
    }

    async fn pump(&mut self, connection: Connection) -> PumpExit {
        let Connection {
            mut sink,
            mut stream,
        } = connection;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    let _ = sink.close().await;
                    return PumpExit::Cancelled;
                }
                frame = self.outbound.recv() => {
                    let Some(frame) = frame else {
                        let _ = sink.close().await;
                        return PumpExit::Cancelled;
                    };
                    let json = match frame.to_json() {
                        Ok(json) => json,
                        Err(err) => {
                            warn!(session = %self.session_id, error = %ChannelError::Encode(err), "dropping frame");
                            continue;
                        }
                    };
                    if let Err(err) = sink.send(json).await {
                        return PumpExit::Failed(err);
                    }
                }
                incoming = stream.next() => match incoming {
                    Some(Ok(text)) => self.forward_frame(&text),
                    Some(Err(ChannelError::Closed)) | None => return PumpExit::Closed,
                    Some(Err(err)) => return PumpExit::Failed(err),
                },
            }
        }
    }

    fn forward_frame(&self, text: &str) {
        match ServerEvent::decode(text) {
            Ok(event) => {
                let _ = self
                    .events
                    .send((self.session_id, ChannelEvent::Frame(event)));
            }
            Err(err) => {
                warn!(session = %self.session_id, error = %err, frame = text, "ignoring malformed frame");
            }
        }
    }

    fn set_status(&self, status: ChannelStatus) {
        self.status.send_replace(status);
        let _ = self
            .events
            .send((self.session_id, ChannelEvent::Status(status)));
    }
}
