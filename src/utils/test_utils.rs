use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{sink, stream};
use tokio::sync::mpsc;

use crate::core::app::App;
use crate::core::channel::{
    ChannelError, ChannelEventReceiver, ChannelStatus, Connection, Transport,
};
use crate::core::history::{HistoryPersistence, MemoryStore};
use crate::core::session::SessionId;
use crate::ui::markdown::Renderer;
use crate::ui::view::DocumentView;

/// Backend side of one scripted connection.
pub struct ScriptedPeer {
    /// Frames the client sent, already JSON encoded.
    pub received: mpsc::UnboundedReceiver<String>,
    push: mpsc::UnboundedSender<Result<String, ChannelError>>,
}

impl ScriptedPeer {
    pub fn push_frame(&self, frame: &str) {
        let _ = self.push.send(Ok(frame.to_string()));
    }
}

/// In-memory [`Transport`] whose connections are driven by the test.
#[derive(Default)]
pub struct ScriptedTransport {
    peers: Mutex<HashMap<SessionId, ScriptedPeer>>,
    refuse: AtomicBool,
    connects: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        let transport = Self::default();
        transport.refuse.store(true, Ordering::SeqCst);
        transport
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn take_peer(&self, session_id: SessionId) -> Option<ScriptedPeer> {
        self.peers.lock().unwrap().remove(&session_id)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, session_id: SessionId) -> Result<Connection, ChannelError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ChannelError::Connect("connection refused".into()));
        }

        let (client_tx, received) = mpsc::unbounded_channel::<String>();
        let (push, client_rx) = mpsc::unbounded_channel::<Result<String, ChannelError>>();

        let frame_sink = sink::unfold(client_tx, |tx, frame: String| async move {
            tx.send(frame)
                .map_err(|_| ChannelError::Send("peer gone".into()))?;
            Ok::<_, ChannelError>(tx)
        });
        let frame_stream = stream::unfold(client_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        self.peers
            .lock()
            .unwrap()
            .insert(session_id, ScriptedPeer { received, push });

        Ok(Connection {
            sink: Box::pin(frame_sink),
            stream: Box::pin(frame_stream),
        })
    }
}

pub fn create_test_app() -> App<DocumentView> {
    let (app, _events) =
        create_test_app_with(Arc::new(ScriptedTransport::new()), MemoryStore::new());
    app
}

pub fn create_test_app_with(
    transport: Arc<ScriptedTransport>,
    store: MemoryStore,
) -> (App<DocumentView>, ChannelEventReceiver) {
    App::new(
        transport,
        Duration::from_millis(10),
        HistoryPersistence::new(Box::new(store)),
        Renderer::default(),
        DocumentView::new(),
        None,
    )
}

/// Waits until the active session's channel reports open.
pub async fn wait_until_open(app: &App<DocumentView>, id: SessionId) {
    let mut rx = app
        .channels()
        .status_receiver(id)
        .expect("channel registered");
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|status| *status == ChannelStatus::Open),
    )
    .await
    .expect("timed out waiting for open channel")
    .expect("supervisor dropped");
}
