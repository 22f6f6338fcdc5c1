//! `askportal ask`: one question, one answer, then exit.

use std::error::Error;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::api::{ClientFrame, ServerEvent};
use crate::core::channel::{
    ChannelEvent, ChannelManager, ChannelStatus, Transport, DEFAULT_RECONNECT_DELAY,
};
use crate::core::history::{now_ms, HistoryPersistence};
use crate::core::reducer::{self, Effect};
use crate::core::session::{Session, SessionId};
use crate::ui::markdown::{plain_text, Renderer};
use crate::ui::terminal::TerminalView;
use crate::ui::view::ViewController;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum AskError {
    EmptyQuestion,
    ConnectTimeout(Duration),
    /// The channel dropped before the answer finished.
    ConnectionLost,
    /// The server ended the turn with an error frame.
    Server(String),
}

impl fmt::Display for AskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AskError::EmptyQuestion => write!(f, "question is empty"),
            AskError::ConnectTimeout(after) => {
                write!(f, "could not connect within {}s", after.as_secs_f32())
            }
            AskError::ConnectionLost => write!(f, "connection lost before the answer finished"),
            AskError::Server(content) => write!(f, "server error: {content}"),
        }
    }
}

impl Error for AskError {}

pub struct AskOptions {
    pub model_hint: Option<String>,
    /// Print the answer as it arrives instead of once it is complete.
    pub stream: bool,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            model_hint: None,
            stream: true,
            connect_timeout: CONNECT_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Only the answer itself reaches the output; the prompt and typing
/// indicator belong to the interactive chat.
fn shown_in_one_shot(effect: &Effect) -> bool {
    matches!(
        effect,
        Effect::RenderInFlight | Effect::ShowToolCall { .. } | Effect::FinalizeInFlight { .. }
    )
}

async fn wait_for_open(
    channels: &ChannelManager,
    id: SessionId,
    limit: Duration,
) -> Result<(), AskError> {
    let Some(mut status) = channels.status_receiver(id) else {
        return Err(AskError::ConnectionLost);
    };
    let result = match tokio::time::timeout(limit, status.wait_for(|s| *s == ChannelStatus::Open)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(_)) => Err(AskError::ConnectionLost),
        Err(_) => Err(AskError::ConnectTimeout(limit)),
    };
    result
}

/// Asks `question` on a fresh conversation `id`, writes the answer to `out`
/// and records the exchange through `persistence`.
pub async fn ask<W: Write>(
    transport: Arc<dyn Transport>,
    persistence: &HistoryPersistence,
    renderer: Renderer,
    id: SessionId,
    question: &str,
    options: AskOptions,
    out: &mut W,
) -> Result<(), AskError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AskError::EmptyQuestion);
    }

    let (mut channels, mut events) = ChannelManager::new(transport, options.reconnect_delay);
    channels.ensure_open(id);
    wait_for_open(&channels, id, options.connect_timeout).await?;
    if !channels.send(id, ClientFrame::question(question, options.model_hint)) {
        return Err(AskError::ConnectionLost);
    }

    let mut session = Session::new(id);
    let mut view = options
        .stream
        .then(|| ViewController::new(TerminalView::new(&mut *out), renderer));
    let mut failure = None;
    let mut finished = false;

    let mut pending = reducer::submit(&mut session, question);
    loop {
        if let Some(view) = view.as_mut() {
            for effect in pending.iter().filter(|effect| shown_in_one_shot(effect)) {
                view.apply(&mut session, effect);
            }
        }
        if finished {
            break;
        }

        let Some((_, event)) = events.recv().await else {
            return Err(AskError::ConnectionLost);
        };
        pending = match event {
            ChannelEvent::Status(ChannelStatus::Closed | ChannelStatus::Error) => {
                return Err(AskError::ConnectionLost);
            }
            ChannelEvent::Status(_) => Vec::new(),
            ChannelEvent::Frame(frame) => {
                finished = frame.is_terminal();
                if let ServerEvent::Error { content } = &frame {
                    failure = Some(content.clone());
                }
                reducer::reduce(&mut session, frame)
            }
        };
    }
    drop(view);

    if !options.stream {
        if let Some(answer) = session.messages.iter().rev().find(|m| !m.is_user()) {
            let text = format!("{}\n", plain_text(&answer.content, true));
            if let Err(err) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
                debug!(error = %err, "writing answer failed");
            }
        }
    }

    let mut history = persistence.load();
    let now = now_ms();
    history.create(id, now);
    history.derive_title_if_untitled(&id, question, now);
    history.update_messages(id, &session.messages, now);
    history.enforce_limit(Some(id));
    if !persistence.save(&history) {
        warn!(session = %id, "conversation could not be saved");
    }

    match failure {
        Some(content) => Err(AskError::Server(content)),
        None => Ok(()),
    }
}
