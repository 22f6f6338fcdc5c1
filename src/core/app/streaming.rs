use tracing::{debug, info};

use crate::api::ClientFrame;
use crate::core::channel::ChannelEvent;
use crate::core::history::now_ms;
use crate::core::reducer::{self, Effect};
use crate::core::session::SessionId;
use crate::ui::view::ViewSurface;

use super::App;

/// What became of a send request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The question was empty after trimming.
    Empty,
    /// A turn is already streaming on the active session.
    Busy,
    /// The active session's channel is not open. Nothing was recorded.
    NotConnected,
}

impl<V: ViewSurface> App<V> {
    /// Sends `question` on the active session and starts a turn.
    pub fn send_message(&mut self, question: &str) -> SendOutcome {
        let question = question.trim();
        if question.is_empty() {
            return SendOutcome::Empty;
        }

        let id = self.active;
        if self.sessions.get(&id).is_some_and(|session| session.streaming) {
            return SendOutcome::Busy;
        }
        let frame = ClientFrame::question(question, self.model_hint.clone());
        if !self.channels.send(id, frame) {
            debug!(session = %id, "send ignored; channel not open");
            return SendOutcome::NotConnected;
        }

        let session = self.sessions.get_or_create(id);
        let effects = reducer::submit(session, question);
        if self.history.derive_title_if_untitled(&id, question, now_ms()) {
            self.save_history();
            self.refresh_session_list();
        }
        self.apply_effects(id, effects);
        SendOutcome::Sent
    }

    /// Feeds one supervisor notification into the session it belongs to.
    pub fn handle_channel_event(&mut self, id: SessionId, event: ChannelEvent) {
        match event {
            ChannelEvent::Status(status) => {
                if id == self.active {
                    self.view.set_status(status);
                }
            }
            ChannelEvent::Frame(frame) => {
                let Some(session) = self.sessions.get_mut(&id) else {
                    debug!(session = %id, "dropping frame for deleted session");
                    return;
                };
                let effects = reducer::reduce(session, frame);
                self.apply_effects(id, effects);
            }
        }
    }

    /// Runs reducer effects. View effects reach the document only when `id`
    /// is the visible session; background sessions just keep their state.
    pub(super) fn apply_effects(&mut self, id: SessionId, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Persist => self.persist(id),
                Effect::RefreshSessionList => self.refresh_session_list(),
                effect if id == self.active => {
                    if let Some(session) = self.sessions.get_mut(&id) {
                        self.view.apply(session, &effect);
                    }
                }
                _ => {}
            }
        }
    }

    /// Snapshots the session's messages into its record, trims history and
    /// writes it.
    pub(super) fn persist(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get(&id) else {
            return;
        };
        self.history.update_messages(id, &session.messages, now_ms());

        for evicted in self.history.enforce_limit(Some(self.active)) {
            info!(session = %evicted, "evicting conversation from history");
            self.sessions.remove(&evicted);
            self.channels.close(evicted);
        }
        self.save_history();
    }
}
