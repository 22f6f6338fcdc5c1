//! The coordinator that owns every piece of conversation state.
//!
//! `App` holds the session store, the history list, the channel manager and
//! the view controller. All mutation goes through it: user actions arrive as
//! method calls, server traffic arrives through [`App::handle_channel_event`],
//! and reducer effects are fanned out from one place. It is driven from a
//! single task, so none of its state needs locking.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::core::channel::{ChannelEventReceiver, ChannelManager, Transport};
use crate::core::history::{now_ms, History, HistoryPersistence};
use crate::core::session::{Session, SessionId, SessionStore};
use crate::ui::markdown::Renderer;
use crate::ui::view::{SessionListEntry, ViewController, ViewSurface};

mod conversation;
mod streaming;

pub use streaming::SendOutcome;

pub struct App<V: ViewSurface> {
    sessions: SessionStore,
    history: History,
    persistence: HistoryPersistence,
    channels: ChannelManager,
    view: ViewController<V>,
    active: SessionId,
    model_hint: Option<String>,
}

impl<V: ViewSurface> App<V> {
    /// Loads history, activates the most recent conversation (or a fresh one
    /// when history is empty) and starts its channel. Must be called from
    /// within a tokio runtime.
    pub fn new(
        transport: Arc<dyn Transport>,
        reconnect_delay: Duration,
        persistence: HistoryPersistence,
        renderer: Renderer,
        surface: V,
        model_hint: Option<String>,
    ) -> (Self, ChannelEventReceiver) {
        let (channels, events) = ChannelManager::new(transport, reconnect_delay);
        let mut history = persistence.load();

        let (active, created) = match history.most_recent() {
            Some(record) => (record.id, false),
            None => {
                let id = SessionId::new();
                history.create(id, now_ms());
                (id, true)
            }
        };

        let mut app = Self {
            sessions: SessionStore::new(),
            history,
            persistence,
            channels,
            view: ViewController::new(surface, renderer),
            active,
            model_hint,
        };
        if created {
            app.save_history();
        }
        info!(session = %active, conversations = app.history.len(), "starting");
        app.activate(active);
        (app, events)
    }

    pub fn active_id(&self) -> SessionId {
        self.active
    }

    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.sessions.get(&self.active)
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn channels(&self) -> &ChannelManager {
        &self.channels
    }

    pub fn view(&self) -> &V {
        self.view.surface()
    }

    pub fn view_mut(&mut self) -> &mut V {
        self.view.surface_mut()
    }

    pub fn renderer(&self) -> &Renderer {
        self.view.renderer()
    }

    pub fn model_hint(&self) -> Option<&str> {
        self.model_hint.as_deref()
    }

    /// History entries in display order, with the active one marked.
    pub fn session_list(&self) -> Vec<SessionListEntry> {
        self.history
            .records()
            .iter()
            .map(|record| SessionListEntry {
                id: record.id,
                title: record.title.clone(),
                active: record.id == self.active,
                streaming: self
                    .sessions
                    .get(&record.id)
                    .is_some_and(|session| session.streaming),
            })
            .collect()
    }

    fn refresh_session_list(&mut self) {
        let entries = self.session_list();
        self.view.set_session_list(&entries);
    }

    fn save_history(&self) {
        self.persistence.save(&self.history);
    }

    /// Makes `id` the visible session: creates it from its record if needed,
    /// opens its channel and rebuilds the document.
    fn activate(&mut self, id: SessionId) {
        self.active = id;
        if !self.sessions.contains(&id) {
            let messages = self
                .history
                .get(&id)
                .map(|record| record.messages.clone())
                .unwrap_or_default();
            self.sessions.restore(id, messages);
        }
        self.channels.ensure_open(id);

        let session = self.sessions.get_or_create(id);
        self.view.redraw(session);
        if let Some(status) = self.channels.status(id) {
            self.view.set_status(status);
        }
        self.refresh_session_list();
    }
}
