//! `askportal history`: inspect saved conversations without connecting.

use std::error::Error;
use std::fmt;

use chrono::{DateTime, Local};

use crate::core::history::{ConversationRecord, History, HistoryPersistence};
use crate::core::message::Role;
use crate::ui::markdown::Renderer;
use crate::ui::view::transcript_html;

#[derive(Debug)]
pub struct NoSuchConversation(pub String);

impl fmt::Display for NoSuchConversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No conversation matches '{}'", self.0)
    }
}

impl Error for NoSuchConversation {}

fn format_timestamp(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn find<'a>(history: &'a History, selector: &str) -> Result<&'a ConversationRecord, NoSuchConversation> {
    history
        .resolve(selector)
        .and_then(|id| history.get(&id))
        .ok_or_else(|| NoSuchConversation(selector.to_string()))
}

pub fn list_conversations(history: &History) -> String {
    if history.is_empty() {
        return "No saved conversations.".to_string();
    }
    history
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| {
            format!(
                "{:>2}. {}  {}  {} ({} messages)",
                index + 1,
                record.id.short(),
                format_timestamp(record.last_updated),
                record.title,
                record.messages.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The conversation as plain text, or as HTML through the finalize render.
pub fn show_conversation(
    history: &History,
    selector: &str,
    html: bool,
    renderer: &Renderer,
) -> Result<String, NoSuchConversation> {
    let record = find(history, selector)?;
    if html {
        return Ok(transcript_html(renderer, &record.messages));
    }

    let mut text = format!("# {}\n", record.title);
    for message in &record.messages {
        let speaker = match message.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        text.push_str(&format!("\n## {speaker}\n\n{}\n", message.content.trim_end()));
    }
    Ok(text)
}

/// Removes a conversation and saves. Returns its title.
pub fn delete_conversation(
    history: &mut History,
    persistence: &HistoryPersistence,
    selector: &str,
) -> Result<String, Box<dyn Error>> {
    let id = find(history, selector)?.id;
    let record = history
        .remove(&id)
        .ok_or_else(|| NoSuchConversation(selector.to_string()))?;
    if !persistence.save(history) {
        return Err("could not save conversation history".into());
    }
    Ok(record.title)
}
