use tracing::{debug, info};

use crate::api::ClientFrame;
use crate::core::history::now_ms;
use crate::core::reducer::Effect;
use crate::core::session::SessionId;
use crate::ui::view::ViewSurface;

use super::{App, SendOutcome};

impl<V: ViewSurface> App<V> {
    /// Starts an empty conversation and makes it visible.
    pub fn new_conversation(&mut self) -> SessionId {
        let id = SessionId::new();
        self.history.create(id, now_ms());
        self.save_history();
        info!(session = %id, "new conversation");
        self.switch_to(id);
        id
    }

    /// Makes `id` the visible conversation. The previous one is snapshotted
    /// first. A turn still streaming on `id` is shown with everything received
    /// so far. Returns `false` when no such conversation exists.
    pub fn switch_to(&mut self, id: SessionId) -> bool {
        if !self.history.contains(&id) {
            debug!(session = %id, "switch to unknown conversation");
            return false;
        }
        if id == self.active {
            return true;
        }

        let previous = self.active;
        if let Some(session) = self.sessions.get_mut(&previous) {
            self.view.detach(session);
            self.persist(previous);
        }
        self.activate(id);
        true
    }

    /// Removes a conversation and closes its channel. Deleting the visible one
    /// moves to the most recent remaining conversation, or a fresh one when
    /// none is left.
    pub fn delete(&mut self, id: SessionId) -> bool {
        let had_record = self.history.remove(&id).is_some();
        let had_session = self.sessions.remove(&id).is_some();
        if !had_record && !had_session {
            return false;
        }
        self.channels.close(id);
        self.save_history();
        info!(session = %id, "deleted conversation");

        if id == self.active {
            match self.history.most_recent().map(|record| record.id) {
                Some(next) => self.activate(next),
                None => {
                    self.new_conversation();
                }
            }
        } else {
            self.refresh_session_list();
        }
        true
    }

    /// Empties the visible conversation and asks the backend to drop its
    /// memory of it.
    pub fn clear_conversation(&mut self) -> SendOutcome {
        let id = self.active;
        if self.sessions.get(&id).is_some_and(|session| session.streaming) {
            return SendOutcome::Busy;
        }
        if !self.channels.send(id, ClientFrame::clear()) {
            return SendOutcome::NotConnected;
        }

        self.sessions.get_or_create(id).messages.clear();
        self.apply_effects(
            id,
            vec![
                Effect::RedrawTranscript,
                Effect::RefreshSessionList,
                Effect::Persist,
            ],
        );
        SendOutcome::Sent
    }

    /// Resolves a session-list position, full id or id prefix.
    pub fn resolve(&self, selector: &str) -> Option<SessionId> {
        self.history.resolve(selector)
    }
}
