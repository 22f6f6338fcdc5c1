//! Visible-document boundary.
//!
//! [`ViewSurface`] is what a front end implements. [`ViewController`] is the
//! only code that calls into it: it turns reducer [`Effect`]s for the active
//! session into surface calls and owns the render pipeline used to produce
//! markup. Background sessions never reach the controller.

use std::time::Instant;

use tracing::debug;

use crate::core::channel::ChannelStatus;
use crate::core::message::{Message, Role};
use crate::core::reducer::Effect;
use crate::core::session::{Session, SessionId, ViewHandle};
use crate::ui::markdown::{escape_html, RenderedMessage, Renderer};

pub const WELCOME_TITLE: &str = "Welcome to ask-cbioportal";
pub const WELCOME_TEXT: &str = "Ask questions about cancer genomics data from cBioPortal.";
pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "What studies are available for breast cancer?",
    "How many samples have TP53 mutations in lung adenocarcinoma?",
    "Show the most frequently mutated genes in glioblastoma as a chart",
];

/// Transient state shown on the in-flight message until text arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Affordance {
    Typing,
    ToolCall(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionListEntry {
    pub id: SessionId,
    pub title: String,
    pub active: bool,
    pub streaming: bool,
}

pub trait ViewSurface {
    /// Removes every message node.
    fn clear(&mut self);
    fn show_welcome(&mut self);
    fn append_message(&mut self, role: Role, message: &RenderedMessage);
    /// Creates the node for an assistant reply that is still streaming.
    fn open_in_flight(&mut self) -> ViewHandle;
    /// Replaces any previous affordance on the node.
    fn show_affordance(&mut self, handle: ViewHandle, affordance: Affordance);
    /// Replaces the node's content and drops its affordance.
    fn update_in_flight(&mut self, handle: ViewHandle, message: &RenderedMessage);
    /// Turns the node into a settled assistant message.
    fn finalize_in_flight(&mut self, handle: ViewHandle, message: &RenderedMessage);
    fn remove_in_flight(&mut self, handle: ViewHandle);
    fn set_session_list(&mut self, entries: &[SessionListEntry]);
    fn set_status(&mut self, status: ChannelStatus);
    fn set_input_enabled(&mut self, enabled: bool);
}

pub struct ViewController<V> {
    surface: V,
    renderer: Renderer,
}

impl<V: ViewSurface> ViewController<V> {
    pub fn new(surface: V, renderer: Renderer) -> Self {
        Self { surface, renderer }
    }

    pub fn surface(&self) -> &V {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut V {
        &mut self.surface
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Applies one effect for the visible `session`.
    pub fn apply(&mut self, session: &mut Session, effect: &Effect) {
        match effect {
            Effect::AppendUserMessage { content } => {
                let rendered = self.renderer.render_message(&Message::user(content.as_str()));
                self.surface.append_message(Role::User, &rendered);
            }
            Effect::ShowTyping => {
                let handle = self.ensure_in_flight(session);
                self.surface.show_affordance(handle, Affordance::Typing);
            }
            Effect::RenderInFlight => self.render_in_flight(session),
            Effect::ShowToolCall { name } => {
                let handle = self.ensure_in_flight(session);
                self.surface
                    .show_affordance(handle, Affordance::ToolCall(name.clone()));
            }
            Effect::FinalizeInFlight { content } => self.finalize(session, content),
            Effect::RedrawTranscript => self.redraw(session),
            Effect::SetInputEnabled(enabled) => self.surface.set_input_enabled(*enabled),
            Effect::RefreshSessionList | Effect::Persist => {}
        }
    }

    /// Rebuilds the whole document for `session`, including the in-flight
    /// reply when a turn is still streaming.
    pub fn redraw(&mut self, session: &mut Session) {
        self.surface.clear();
        session.view = None;

        if session.messages.is_empty() && !session.streaming {
            self.surface.show_welcome();
        }
        for message in &session.messages {
            let rendered = self.renderer.render_message(message);
            self.surface.append_message(message.role, &rendered);
        }

        if session.streaming {
            if session.raw_buffer.is_empty() {
                let handle = self.ensure_in_flight(session);
                self.surface.show_affordance(handle, Affordance::Typing);
            } else {
                self.render_in_flight(session);
            }
        }
        self.surface.set_input_enabled(!session.streaming);
    }

    /// Forgets the in-flight node of a session that is no longer visible.
    pub fn detach(&mut self, session: &mut Session) {
        session.view = None;
    }

    pub fn set_session_list(&mut self, entries: &[SessionListEntry]) {
        self.surface.set_session_list(entries);
    }

    pub fn set_status(&mut self, status: ChannelStatus) {
        self.surface.set_status(status);
    }

    fn ensure_in_flight(&mut self, session: &mut Session) -> ViewHandle {
        match session.view {
            Some(handle) => handle,
            None => {
                let handle = self.surface.open_in_flight();
                session.view = Some(handle);
                handle
            }
        }
    }

    fn render_in_flight(&mut self, session: &mut Session) {
        let handle = self.ensure_in_flight(session);
        let elapsed = session.chart_render_start.map(|start| start.elapsed());
        let render = self.renderer.render_streaming(&session.raw_buffer, elapsed);
        if render.has_placeholder && session.chart_render_start.is_none() {
            session.chart_render_start = Some(Instant::now());
        }
        self.surface.update_in_flight(
            handle,
            &RenderedMessage {
                raw: session.raw_buffer.clone(),
                markup: render.markup,
            },
        );
    }

    fn finalize(&mut self, session: &mut Session, content: &str) {
        let handle = session.view.take();
        if content.is_empty() {
            if let Some(handle) = handle {
                self.surface.remove_in_flight(handle);
            }
            return;
        }

        let rendered = RenderedMessage {
            raw: content.to_string(),
            markup: self.renderer.render_final(content),
        };
        match handle {
            Some(handle) => self.surface.finalize_in_flight(handle, &rendered),
            None => {
                debug!(session = %session.id, "settled without an in-flight node");
                self.surface.append_message(Role::Assistant, &rendered);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Welcome,
    Message(Role),
    InFlight(ViewHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub raw: String,
    pub markup: String,
    pub affordance: Option<Affordance>,
}

/// In-memory document. Backs tests and HTML export.
#[derive(Debug, Default)]
pub struct DocumentView {
    nodes: Vec<Node>,
    next_handle: u64,
    session_list: Vec<SessionListEntry>,
    status: Option<ChannelStatus>,
    input_enabled: bool,
}

impl DocumentView {
    pub fn new() -> Self {
        Self {
            input_enabled: true,
            ..Self::default()
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn has_welcome(&self) -> bool {
        self.nodes.iter().any(|node| node.kind == NodeKind::Welcome)
    }

    /// Settled messages in document order.
    pub fn messages(&self) -> impl Iterator<Item = (Role, &Node)> {
        self.nodes.iter().filter_map(|node| match node.kind {
            NodeKind::Message(role) => Some((role, node)),
            _ => None,
        })
    }

    pub fn in_flight(&self) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|node| matches!(node.kind, NodeKind::InFlight(_)))
    }

    pub fn session_list(&self) -> &[SessionListEntry] {
        &self.session_list
    }

    pub fn status(&self) -> Option<ChannelStatus> {
        self.status
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Standalone HTML fragment of the transcript.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<div class=\"chat\">\n");
        for node in &self.nodes {
            match &node.kind {
                NodeKind::Welcome => out.push_str(&welcome_markup()),
                NodeKind::Message(role) => {
                    out.push_str(&format!(
                        "<div class=\"message {}\">\n{}</div>\n",
                        role.as_str(),
                        node.markup
                    ));
                }
                NodeKind::InFlight(_) => {
                    out.push_str(&format!(
                        "<div class=\"message assistant streaming\">\n{}</div>\n",
                        node.markup
                    ));
                }
            }
        }
        out.push_str("</div>\n");
        out
    }

    fn node_mut(&mut self, handle: ViewHandle) -> Option<&mut Node> {
        let node = self
            .nodes
            .iter_mut()
            .find(|node| node.kind == NodeKind::InFlight(handle));
        if node.is_none() {
            debug!(handle = handle.0, "no in-flight node for handle");
        }
        node
    }

    fn drop_welcome(&mut self) {
        self.nodes.retain(|node| node.kind != NodeKind::Welcome);
    }
}

/// Renders finalized messages into a standalone HTML fragment.
pub fn transcript_html(renderer: &Renderer, messages: &[Message]) -> String {
    let mut document = DocumentView::new();
    for message in messages {
        document.append_message(message.role, &renderer.render_message(message));
    }
    document.to_html()
}

fn welcome_markup() -> String {
    let examples: String = EXAMPLE_QUESTIONS
        .iter()
        .map(|q| format!("<button class=\"example\">{}</button>", escape_html(q)))
        .collect();
    format!(
        "<div class=\"welcome\"><h2>{WELCOME_TITLE}</h2><p>{WELCOME_TEXT}</p>{examples}</div>\n"
    )
}

fn affordance_markup(affordance: &Affordance) -> String {
    match affordance {
        Affordance::Typing => {
            "<div class=\"typing-indicator\"><span></span><span></span><span></span></div>".into()
        }
        Affordance::ToolCall(name) => {
            format!("<div class=\"tool-call\">Calling: {}</div>", escape_html(name))
        }
    }
}

impl ViewSurface for DocumentView {
    fn clear(&mut self) {
        self.nodes.clear();
    }

    fn show_welcome(&mut self) {
        if !self.has_welcome() {
            self.nodes.push(Node {
                kind: NodeKind::Welcome,
                raw: String::new(),
                markup: welcome_markup(),
                affordance: None,
            });
        }
    }

    fn append_message(&mut self, role: Role, message: &RenderedMessage) {
        self.drop_welcome();
        self.nodes.push(Node {
            kind: NodeKind::Message(role),
            raw: message.raw.clone(),
            markup: message.markup.clone(),
            affordance: None,
        });
    }

    fn open_in_flight(&mut self) -> ViewHandle {
        self.drop_welcome();
        self.next_handle += 1;
        let handle = ViewHandle(self.next_handle);
        self.nodes.push(Node {
            kind: NodeKind::InFlight(handle),
            raw: String::new(),
            markup: String::new(),
            affordance: None,
        });
        handle
    }

    fn show_affordance(&mut self, handle: ViewHandle, affordance: Affordance) {
        if let Some(node) = self.node_mut(handle) {
            if node.raw.is_empty() {
                node.markup = affordance_markup(&affordance);
            }
            node.affordance = Some(affordance);
        }
    }

    fn update_in_flight(&mut self, handle: ViewHandle, message: &RenderedMessage) {
        if let Some(node) = self.node_mut(handle) {
            node.raw = message.raw.clone();
            node.markup = message.markup.clone();
            node.affordance = None;
        }
    }

    fn finalize_in_flight(&mut self, handle: ViewHandle, message: &RenderedMessage) {
        if let Some(node) = self.node_mut(handle) {
            node.kind = NodeKind::Message(Role::Assistant);
            node.raw = message.raw.clone();
            node.markup = message.markup.clone();
            node.affordance = None;
        }
    }

    fn remove_in_flight(&mut self, handle: ViewHandle) {
        self.nodes
            .retain(|node| node.kind != NodeKind::InFlight(handle));
    }

    fn set_session_list(&mut self, entries: &[SessionListEntry]) {
        self.session_list = entries.to_vec();
    }

    fn set_status(&mut self, status: ChannelStatus) {
        self.status = Some(status);
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }
}
