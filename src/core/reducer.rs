//! Per-session turn state machine.
//!
//! A session is either idle or streaming. `submit` moves it to streaming;
//! the `done` and `error` server events settle it back to idle. Every
//! transition returns the view and persistence work it implies as a list of
//! [`Effect`] descriptors instead of performing that work itself.

use tracing::debug;

use crate::api::ServerEvent;
use crate::core::message::Message;
use crate::core::session::Session;

pub const ERROR_NOTICE_PREFIX: &str = "**Error:** ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Show a finalized user message.
    AppendUserMessage { content: String },
    /// Show the typing indicator in place of the (not yet created) reply.
    ShowTyping,
    /// Re-render the in-flight reply from the session's raw buffer, creating
    /// its node first when none exists.
    RenderInFlight,
    /// Replace any transient affordance with "invoking `name`".
    ShowToolCall { name: String },
    /// Fully render `content` into the in-flight node and drop transient
    /// affordances. An empty `content` removes the node.
    FinalizeInFlight { content: String },
    /// Re-render the finalized transcript from scratch.
    RedrawTranscript,
    SetInputEnabled(bool),
    RefreshSessionList,
    /// Snapshot the session's messages into its conversation record and
    /// write history.
    Persist,
}

impl Effect {
    /// Whether the effect mutates the visible document. Such effects are
    /// skipped for background sessions.
    pub fn touches_view(&self) -> bool {
        !matches!(self, Effect::Persist | Effect::RefreshSessionList)
    }
}

/// Records a user question and starts a new turn.
pub fn submit(session: &mut Session, question: &str) -> Vec<Effect> {
    session.messages.push(Message::user(question));
    session.begin_turn();
    vec![
        Effect::AppendUserMessage {
            content: question.to_string(),
        },
        Effect::ShowTyping,
        Effect::SetInputEnabled(false),
    ]
}

/// Applies one inbound server event to `session`.
pub fn reduce(session: &mut Session, event: ServerEvent) -> Vec<Effect> {
    match event {
        ServerEvent::Chunk { content } => append_chunk(session, &content),
        ServerEvent::ToolCall { name } => vec![Effect::ShowToolCall { name }],
        ServerEvent::Done => settle(session),
        ServerEvent::Error { content } => {
            append_error_notice(&mut session.raw_buffer, &content);
            settle(session)
        }
        ServerEvent::Cleared => {
            session.messages.clear();
            vec![
                Effect::RedrawTranscript,
                Effect::RefreshSessionList,
                Effect::Persist,
            ]
        }
    }
}

fn append_chunk(session: &mut Session, content: &str) -> Vec<Effect> {
    if !session.streaming {
        debug!(session = %session.id, "chunk arrived outside a turn; opening one");
        session.streaming = true;
    }
    if content.is_empty() {
        return Vec::new();
    }
    session.raw_buffer.push_str(content);
    vec![Effect::RenderInFlight]
}

fn append_error_notice(buffer: &mut String, text: &str) {
    if !buffer.is_empty() {
        buffer.push_str("\n\n");
    }
    buffer.push_str(ERROR_NOTICE_PREFIX);
    buffer.push_str(text);
}

fn settle(session: &mut Session) -> Vec<Effect> {
    let content = std::mem::take(&mut session.raw_buffer);
    if !content.is_empty() {
        session.messages.push(Message::assistant(content.clone()));
    }
    session.streaming = false;
    session.chart_render_start = None;
    vec![
        Effect::FinalizeInFlight { content },
        Effect::SetInputEnabled(true),
        Effect::RefreshSessionList,
        Effect::Persist,
    ]
}
