//! Durable list of conversations.
//!
//! [`History`] is the in-memory, most-recently-updated-first list of
//! [`ConversationRecord`]s. [`HistoryPersistence`] reads it from and writes it
//! to a [`KeyValueStore`] on a best-effort basis: failures are logged and the
//! in-memory copy stays authoritative.

mod store;

pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::message::Message;
use crate::core::session::SessionId;

pub const HISTORY_KEY: &str = "conversations";
pub const HISTORY_LIMIT: usize = 50;
pub const DEFAULT_TITLE: &str = "New conversation";
pub const TITLE_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: SessionId,
    pub title: String,
    /// Epoch milliseconds.
    #[serde(rename = "lastUpdated")]
    pub last_updated: i64,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Whether the title came from a question. Records saved without the
    /// flag count as titled unless they carry the default title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titled: Option<bool>,
}

impl ConversationRecord {
    pub fn new(id: SessionId, now_ms: i64) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            last_updated: now_ms,
            messages: Vec::new(),
            titled: Some(false),
        }
    }

    pub fn is_untitled(&self) -> bool {
        match self.titled {
            Some(titled) => !titled,
            None => self.title == DEFAULT_TITLE,
        }
    }
}

/// Title shown for a conversation: the first [`TITLE_MAX_CHARS`] characters of
/// its first question, with an ellipsis when cut.
pub fn derive_title(question: &str) -> String {
    let question = question.trim();
    let mut chars = question.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    records: Vec<ConversationRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ConversationRecord>) -> Self {
        let mut history = Self { records };
        history.sort();
        history
    }

    pub fn records(&self) -> &[ConversationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &SessionId) -> Option<&ConversationRecord> {
        self.records.iter().find(|record| record.id == *id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.get(id).is_some()
    }

    pub fn most_recent(&self) -> Option<&ConversationRecord> {
        self.records.first()
    }

    pub fn position(&self, id: &SessionId) -> Option<usize> {
        self.records.iter().position(|record| record.id == *id)
    }

    /// Adds an empty, untitled record at the front.
    pub fn create(&mut self, id: SessionId, now_ms: i64) {
        if self.contains(&id) {
            return;
        }
        self.records.insert(0, ConversationRecord::new(id, now_ms));
        self.sort();
    }

    /// Replaces the record's messages and marks it most recently updated.
    /// Creates the record when it is missing.
    pub fn update_messages(&mut self, id: SessionId, messages: &[Message], now_ms: i64) {
        let mut record = match self.position(&id) {
            Some(index) => self.records.remove(index),
            None => ConversationRecord::new(id, now_ms),
        };
        record.messages = messages.to_vec();
        record.last_updated = now_ms;
        self.records.insert(0, record);
        self.sort();
    }

    /// Sets the title from `question` unless the record was titled before.
    /// Returns whether the title was set.
    pub fn derive_title_if_untitled(&mut self, id: &SessionId, question: &str, now_ms: i64) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        if !self.records[index].is_untitled() {
            return false;
        }
        let mut record = self.records.remove(index);
        record.title = derive_title(question);
        record.titled = Some(true);
        record.last_updated = now_ms;
        self.records.insert(0, record);
        self.sort();
        true
    }

    /// Looks a record up by 1-based list position, full id or unique id
    /// prefix. Numbers of up to three digits are positions.
    pub fn resolve(&self, selector: &str) -> Option<SessionId> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        if selector.len() <= 3 {
            if let Ok(position) = selector.parse::<usize>() {
                return position
                    .checked_sub(1)
                    .and_then(|index| self.records.get(index))
                    .map(|record| record.id);
            }
        }
        if let Ok(id) = selector.parse::<SessionId>() {
            return self.contains(&id).then_some(id);
        }
        let mut matches = self
            .records
            .iter()
            .filter(|record| record.id.to_string().starts_with(selector));
        match (matches.next(), matches.next()) {
            (Some(record), None) => Some(record.id),
            _ => None,
        }
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<ConversationRecord> {
        let index = self.position(id)?;
        Some(self.records.remove(index))
    }

    /// Drops the records with the oldest `last_updated` until at most
    /// [`HISTORY_LIMIT`] remain, never dropping `keep`. Returns evicted ids.
    pub fn enforce_limit(&mut self, keep: Option<SessionId>) -> Vec<SessionId> {
        let mut evicted = Vec::new();
        while self.records.len() > HISTORY_LIMIT {
            let Some(index) = self
                .records
                .iter()
                .rposition(|record| Some(record.id) != keep)
            else {
                break;
            };
            evicted.push(self.records.remove(index).id);
        }
        evicted
    }

    /// Most recent [`HISTORY_LIMIT`] records in list order.
    pub fn persisted_view(&self) -> &[ConversationRecord] {
        &self.records[..self.records.len().min(HISTORY_LIMIT)]
    }

    // Stable, so a freshly touched record stays ahead of equal timestamps.
    fn sort(&mut self) {
        self.records
            .sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
    }
}

pub struct HistoryPersistence {
    store: Box<dyn KeyValueStore>,
}

impl HistoryPersistence {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads history from the store. Unreadable or malformed data yields an
    /// empty history.
    pub fn load(&self) -> History {
        let contents = match self.store.load(HISTORY_KEY) {
            Ok(Some(contents)) => contents,
            Ok(None) => return History::new(),
            Err(err) => {
                warn!(error = %err, "could not read conversation history; starting empty");
                return History::new();
            }
        };

        match serde_json::from_str::<Vec<ConversationRecord>>(&contents) {
            Ok(records) => {
                debug!(count = records.len(), "loaded conversation history");
                History::from_records(records)
            }
            Err(err) => {
                warn!(error = %err, "conversation history is malformed; starting empty");
                History::new()
            }
        }
    }

    /// Writes the most recent [`HISTORY_LIMIT`] records. Returns whether the
    /// write succeeded; on failure the previous durable state is left as is.
    pub fn save(&self, history: &History) -> bool {
        let result = serde_json::to_string(history.persisted_view())
            .map_err(StoreError::from)
            .and_then(|json| self.store.save(HISTORY_KEY, &json));
        match result {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "could not save conversation history");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests;
