//! Runtime state of every open conversation.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::message::Message;

/// Client-generated conversation identifier (random v4 UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Opaque reference to the view node rendering a session's in-flight message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    /// Finalized messages, append-only within a turn.
    pub messages: Vec<Message>,
    /// Assistant text received so far for the in-flight turn.
    pub raw_buffer: String,
    pub streaming: bool,
    /// Set only while this session is visible and has an in-flight node.
    pub view: Option<ViewHandle>,
    /// When the first chart placeholder of the current turn was shown. Only
    /// used to keep the spinner animation phase stable across re-renders.
    pub chart_render_start: Option<Instant>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            messages: Vec::new(),
            raw_buffer: String::new(),
            streaming: false,
            view: None,
            chart_render_start: None,
        }
    }

    pub fn with_messages(id: SessionId, messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::new(id)
        }
    }

    /// Marks the start of a turn after the user message has been appended.
    pub fn begin_turn(&mut self) {
        self.raw_buffer.clear();
        self.streaming = true;
        self.chart_render_start = None;
    }

    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(Message::is_user)
    }
}

/// Process-wide map of sessions. Sessions are created lazily the first time an
/// id is referenced and removed only on explicit deletion.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn get_or_create(&mut self, id: SessionId) -> &mut Session {
        self.sessions.entry(id).or_insert_with(|| Session::new(id))
    }

    /// Inserts a session restored from history unless one is already live.
    pub fn restore(&mut self, id: SessionId, messages: Vec<Message>) -> &mut Session {
        self.sessions
            .entry(id)
            .or_insert_with(|| Session::with_messages(id, messages))
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_hyphenated_uuids() {
        let id = SessionId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.parse::<SessionId>().unwrap(), id);
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn get_or_create_is_lazy_and_stable() {
        let mut store = SessionStore::new();
        let id = SessionId::new();
        store.get_or_create(id).messages.push(Message::user("hi"));
        assert_eq!(store.get_or_create(id).messages.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn restore_keeps_live_session_state() {
        let mut store = SessionStore::new();
        let id = SessionId::new();
        store.get_or_create(id).raw_buffer.push_str("partial");
        store.get_mut(&id).unwrap().streaming = true;
        let session = store.restore(id, vec![Message::user("old")]);
        assert!(session.streaming);
        assert!(session.messages.is_empty());
    }

    #[test]
    fn begin_turn_resets_buffers() {
        let mut session = Session::new(SessionId::new());
        session.raw_buffer.push_str("leftover");
        session.chart_render_start = Some(Instant::now());
        session.begin_turn();
        assert!(session.streaming);
        assert!(session.raw_buffer.is_empty());
        assert!(session.chart_render_start.is_none());
    }
}
