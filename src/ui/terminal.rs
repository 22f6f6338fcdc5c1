//! Line-oriented surface for the interactive chat.
//!
//! The terminal shows assistant text through [`plain_text`] instead of
//! markup, so chart payloads appear as status lines. Each update prints only
//! what is not yet on screen.

use std::io::{self, Stdout, Write};

use tracing::debug;

use crate::core::channel::ChannelStatus;
use crate::core::message::Role;
use crate::core::session::ViewHandle;
use crate::ui::markdown::{plain_text, RenderedMessage};
use crate::ui::view::{
    Affordance, SessionListEntry, ViewSurface, EXAMPLE_QUESTIONS, WELCOME_TEXT, WELCOME_TITLE,
};

pub const PROMPT: &str = "> ";

struct InFlight {
    handle: ViewHandle,
    printed: String,
}

pub struct TerminalView<W: Write = Stdout> {
    out: W,
    next_handle: u64,
    in_flight: Option<InFlight>,
    input_enabled: bool,
    /// Set after a drop was announced, until the channel is open again.
    disconnected: bool,
}

impl TerminalView<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            next_handle: 0,
            in_flight: None,
            input_enabled: true,
            disconnected: false,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Prints a one-off line from the chat loop or a command.
    pub fn notice(&mut self, text: &str) {
        self.emit(&format!("{text}\n"));
    }

    /// Shows the input prompt when the user may type a question.
    pub fn prompt(&mut self) {
        if self.input_enabled && self.in_flight.is_none() {
            self.emit(PROMPT);
        }
    }

    fn emit(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(err) = result {
            debug!(error = %err, "terminal write failed");
        }
    }

    fn in_flight_mut(&mut self, handle: ViewHandle) -> Option<&mut InFlight> {
        self.in_flight
            .as_mut()
            .filter(|in_flight| in_flight.handle == handle)
    }

    /// Prints the part of `text` not yet on screen. Text that diverges from
    /// what was printed continues from the last common character.
    fn print_tail(&mut self, handle: ViewHandle, text: String) {
        let Some(in_flight) = self.in_flight_mut(handle) else {
            return;
        };
        let common = in_flight
            .printed
            .char_indices()
            .zip(text.chars())
            .find(|((_, printed), next)| printed != next)
            .map(|((index, _), _)| index)
            .unwrap_or_else(|| in_flight.printed.len().min(text.len()));
        let tail = text[common..].to_string();
        in_flight.printed = text;
        if !tail.is_empty() {
            self.emit(&tail);
        }
    }
}

impl<W: Write> ViewSurface for TerminalView<W> {
    fn clear(&mut self) {
        self.in_flight = None;
        self.emit("\n");
    }

    fn show_welcome(&mut self) {
        let mut text = format!("{WELCOME_TITLE}\n{WELCOME_TEXT}\n\nTry asking:\n");
        for question in EXAMPLE_QUESTIONS {
            text.push_str(&format!("  - {question}\n"));
        }
        text.push_str("\nType /help for commands.\n\n");
        self.emit(&text);
    }

    fn append_message(&mut self, role: Role, message: &RenderedMessage) {
        match role {
            Role::User => self.emit(&format!("{PROMPT}{}\n\n", message.raw)),
            Role::Assistant => self.emit(&format!("{}\n\n", plain_text(&message.raw, true))),
        }
    }

    fn open_in_flight(&mut self) -> ViewHandle {
        self.next_handle += 1;
        let handle = ViewHandle(self.next_handle);
        self.in_flight = Some(InFlight {
            handle,
            printed: String::new(),
        });
        handle
    }

    fn show_affordance(&mut self, handle: ViewHandle, affordance: Affordance) {
        let Some(in_flight) = self.in_flight_mut(handle) else {
            return;
        };
        let line = match affordance {
            Affordance::Typing => "(thinking...)\n".to_string(),
            Affordance::ToolCall(name) => format!("[calling {name}]\n"),
        };
        let line = if !in_flight.printed.is_empty() {
            format!("\n{line}")
        } else {
            line
        };
        self.emit(&line);
    }

    fn update_in_flight(&mut self, handle: ViewHandle, message: &RenderedMessage) {
        self.print_tail(handle, plain_text(&message.raw, false));
    }

    fn finalize_in_flight(&mut self, handle: ViewHandle, message: &RenderedMessage) {
        self.print_tail(handle, plain_text(&message.raw, true));
        if self.in_flight_mut(handle).is_some() {
            self.in_flight = None;
            self.emit("\n\n");
        }
    }

    fn remove_in_flight(&mut self, handle: ViewHandle) {
        if self.in_flight_mut(handle).is_some() {
            self.in_flight = None;
            self.emit("\n");
        }
    }

    fn set_session_list(&mut self, _entries: &[SessionListEntry]) {}

    fn set_status(&mut self, status: ChannelStatus) {
        match status {
            ChannelStatus::Connecting => {}
            ChannelStatus::Open => {
                if self.disconnected {
                    self.disconnected = false;
                    self.emit(&format!("[{}]\n", status.label()));
                }
            }
            ChannelStatus::Closed | ChannelStatus::Error => {
                if !self.disconnected {
                    self.disconnected = true;
                    self.emit(&format!("[{}, retrying]\n", status.label()));
                }
            }
        }
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        let was_enabled = self.input_enabled;
        self.input_enabled = enabled;
        if enabled && !was_enabled {
            self.prompt();
        }
    }
}
