//! Wire payloads exchanged with the ask-cbioportal backend over a session
//! channel.
//!
//! The client sends one [`ClientFrame`] per user turn (or a reset request) and
//! receives a stream of [`ServerEvent`] frames, each a JSON object carrying a
//! `type` discriminator.

use serde::{Deserialize, Serialize};

/// Frame sent from the client to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ClientFrame {
    Question {
        question: String,
        #[serde(rename = "modelHint", skip_serializing_if = "Option::is_none")]
        model_hint: Option<String>,
    },
    /// Asks the backend to drop its conversation memory.
    Clear { clear: bool },
}

impl ClientFrame {
    pub fn question(question: impl Into<String>, model_hint: Option<String>) -> Self {
        ClientFrame::Question {
            question: question.into(),
            model_hint,
        }
    }

    pub fn clear() -> Self {
        ClientFrame::Clear { clear: true }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Frame sent from the backend to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Incremental assistant text.
    Chunk { content: String },
    /// The backend is invoking a capability on the user's behalf.
    ToolCall { name: String },
    /// The turn completed; buffered text is final.
    Done,
    /// The turn failed.
    Error { content: String },
    /// The backend reset its conversation memory.
    Cleared,
}

impl ServerEvent {
    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerEvent::Done | ServerEvent::Error { .. })
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub agent_initialized: bool,
    #[serde(default)]
    pub backend: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_frame_omits_missing_model_hint() {
        let frame = ClientFrame::question("How many studies?", None);
        assert_eq!(
            frame.to_json().unwrap(),
            r#"{"question":"How many studies?"}"#
        );
    }

    #[test]
    fn question_frame_carries_model_hint() {
        let frame = ClientFrame::question("hi", Some("gpt-4".into()));
        assert_eq!(
            frame.to_json().unwrap(),
            r#"{"question":"hi","modelHint":"gpt-4"}"#
        );
    }

    #[test]
    fn clear_frame_matches_backend_contract() {
        assert_eq!(ClientFrame::clear().to_json().unwrap(), r#"{"clear":true}"#);
    }

    #[test]
    fn decodes_every_server_event_kind() {
        let cases = [
            (
                r#"{"type":"chunk","content":"Hel"}"#,
                ServerEvent::Chunk {
                    content: "Hel".into(),
                },
            ),
            (
                r#"{"type":"tool_call","name":"search_studies"}"#,
                ServerEvent::ToolCall {
                    name: "search_studies".into(),
                },
            ),
            (r#"{"type":"done"}"#, ServerEvent::Done),
            (
                r#"{"type":"error","content":"rate limited"}"#,
                ServerEvent::Error {
                    content: "rate limited".into(),
                },
            ),
            (r#"{"type":"cleared"}"#, ServerEvent::Cleared),
        ];
        for (frame, expected) in cases {
            assert_eq!(ServerEvent::decode(frame).unwrap(), expected, "{frame}");
        }
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        assert!(ServerEvent::decode(r#"{"type":"progress"}"#).is_err());
        assert!(ServerEvent::decode("not json").is_err());
    }

    #[test]
    fn health_response_tolerates_missing_backend() {
        let health: HealthResponse =
            serde_json::from_str(r#"{"status":"healthy","agent_initialized":true}"#).unwrap();
        assert_eq!(health.status, "healthy");
        assert!(health.agent_initialized);
        assert!(health.backend.is_none());
    }
}
