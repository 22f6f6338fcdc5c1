//! Slash commands for the interactive chat.
//!
//! Parsing is separate from execution: [`process_input`] maps a line to a
//! [`CommandResult`] and [`execute`] carries it out against an [`App`].

mod registry;

pub use registry::{all_commands, CommandInvocation};

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::app::{App, SendOutcome};
use crate::ui::view::{transcript_html, ViewSurface};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    ProcessAsMessage(String),
    Help,
    NewConversation,
    ListConversations,
    Switch(String),
    Delete(Option<String>),
    Clear,
    Export(PathBuf),
    Quit,
    /// The command was recognized but its arguments were not.
    Usage(&'static str),
}

pub fn process_input(input: &str) -> CommandResult {
    let trimmed = input.trim();

    let Some(rest) = trimmed.strip_prefix('/') else {
        return CommandResult::ProcessAsMessage(input.to_string());
    };

    let mut parts = rest.splitn(2, ' ');
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    match registry::find_command(command_name) {
        Some(command) => (command.handler)(CommandInvocation { args }),
        None => CommandResult::ProcessAsMessage(input.to_string()),
    }
}

pub(super) fn handle_help(_invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Help
}

pub(super) fn handle_new(_invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::NewConversation
}

pub(super) fn handle_list(_invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::ListConversations
}

pub(super) fn handle_switch(invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        return CommandResult::Usage("Usage: /switch <number|id>");
    }
    CommandResult::Switch(invocation.args.to_string())
}

pub(super) fn handle_delete(invocation: CommandInvocation<'_>) -> CommandResult {
    let target = (!invocation.args.is_empty()).then(|| invocation.args.to_string());
    CommandResult::Delete(target)
}

pub(super) fn handle_clear(_invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Clear
}

pub(super) fn handle_export(invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        return CommandResult::Usage("Usage: /export <file>");
    }
    CommandResult::Export(PathBuf::from(invocation.args))
}

pub(super) fn handle_quit(_invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Quit
}

pub fn help_text() -> String {
    let mut text = String::from("Commands:\n");
    for command in all_commands() {
        text.push_str(&format!("  {:<22} {}\n", command.usage, command.help));
    }
    text.push_str("Anything else is sent as a question.");
    text
}

/// Numbered session list, most recently updated first.
pub fn conversation_list<V: ViewSurface>(app: &App<V>) -> String {
    app.session_list()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            format!(
                "{} {:>2}. {} ({}){}",
                if entry.active { "*" } else { " " },
                index + 1,
                entry.title,
                entry.id.short(),
                if entry.streaming { " [answering]" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes the active conversation as HTML. Refuses to overwrite an existing
/// file.
pub fn export_conversation<V: ViewSurface>(app: &App<V>, path: &Path) -> io::Result<usize> {
    let messages = app
        .active_session()
        .map(|session| session.messages.as_slice())
        .unwrap_or_default();
    let html = transcript_html(app.renderer(), messages);

    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(html.as_bytes())?;
    writer.flush()?;
    Ok(messages.len())
}

fn send_feedback(outcome: SendOutcome) -> Option<String> {
    match outcome {
        SendOutcome::Sent | SendOutcome::Empty => None,
        SendOutcome::Busy => Some("Still answering; wait for the current reply to finish.".into()),
        SendOutcome::NotConnected => Some("Not connected to the server yet; try again shortly.".into()),
    }
}

/// Carries out `result`. Returns a line to show the user, if any. `Quit` is
/// left to the caller.
pub fn execute<V: ViewSurface>(app: &mut App<V>, result: CommandResult) -> Option<String> {
    match result {
        CommandResult::ProcessAsMessage(text) => send_feedback(app.send_message(&text)),
        CommandResult::Help => Some(help_text()),
        CommandResult::NewConversation => {
            app.new_conversation();
            None
        }
        CommandResult::ListConversations => Some(conversation_list(app)),
        CommandResult::Switch(selector) => match app.resolve(&selector) {
            Some(id) => {
                app.switch_to(id);
                None
            }
            None => Some(format!("No conversation matches '{selector}'.")),
        },
        CommandResult::Delete(selector) => {
            let target = match selector {
                Some(selector) => match app.resolve(&selector) {
                    Some(id) => id,
                    None => return Some(format!("No conversation matches '{selector}'.")),
                },
                None => app.active_id(),
            };
            let title = app
                .history()
                .get(&target)
                .map(|record| record.title.clone())
                .unwrap_or_default();
            app.delete(target);
            Some(format!("Deleted \"{title}\"."))
        }
        CommandResult::Clear => match app.clear_conversation() {
            SendOutcome::Sent => Some("Conversation cleared.".into()),
            other => send_feedback(other),
        },
        CommandResult::Export(path) => match export_conversation(app, &path) {
            Ok(count) => Some(format!("Exported {count} messages to {}", path.display())),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Some(format!("{} already exists.", path.display()))
            }
            Err(err) => Some(format!("Export failed: {err}")),
        },
        CommandResult::Quit => None,
        CommandResult::Usage(usage) => Some(usage.to_string()),
    }
}

#[cfg(test)]
mod tests;
