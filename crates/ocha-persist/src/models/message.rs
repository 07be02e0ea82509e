use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Database-agnostic message model
///
/// Messages are immutable once created; ordering within a thread is by
/// `created_at`, insertion order breaking ties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Flattened text view: the concatenation of all text parts.
    /// Tool parts are carried through storage but contribute nothing here.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if let MessagePart::Text { text } = part {
                out.push_str(text);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// One typed fragment of a message.
///
/// The closed union replaces the source's duck-typed `parts` blob; every
/// consumer matches exhaustively and inserts go through [`MessagePart::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePart {
    Text {
        text: String,
    },

    Tool {
        /// Tool name, e.g. "web_search"
        tool: String,
        tool_call_id: String,
        state: PartState,
        #[serde(skip_serializing_if = "Option::is_none")]
        input: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<serde_json::Value>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartState {
    Call,
    OutputAvailable,
    Partial,
    Error,
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Enforce the part invariants at the persistence boundary:
    /// `output` may only be present when `state` is `output-available`.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Text { .. } => Ok(()),
            Self::Tool { state, output, .. } => {
                if output.is_some() && *state != PartState::OutputAvailable {
                    return Err(StoreError::InvalidPart(format!(
                        "output present with state {:?}",
                        state
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Validate every part of a prospective message before insert.
pub(crate) fn validate_parts(parts: &[MessagePart]) -> Result<()> {
    for part in parts {
        part.validate()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_part_roundtrip() {
        let part = MessagePart::text("hello");
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("\"type\":\"text\""));

        let back: MessagePart = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, MessagePart::Text { text } if text == "hello"));
    }

    #[test]
    fn tool_part_state_serializes_kebab_case() {
        let part = MessagePart::Tool {
            tool: "web_search".to_string(),
            tool_call_id: "call_1".to_string(),
            state: PartState::OutputAvailable,
            input: Some(json!({"query": "tea"})),
            output: Some(json!({"results": []})),
        };
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("\"state\":\"output-available\""));
    }

    #[test]
    fn unknown_state_rejected() {
        let json = r#"{"type":"tool","tool":"web_search","tool_call_id":"c","state":"running"}"#;
        assert!(serde_json::from_str::<MessagePart>(json).is_err());
    }

    #[test]
    fn output_requires_output_available() {
        let part = MessagePart::Tool {
            tool: "web_search".to_string(),
            tool_call_id: "call_1".to_string(),
            state: PartState::Call,
            input: None,
            output: Some(json!({})),
        };
        assert!(part.validate().is_err());
    }

    #[test]
    fn flattened_text_skips_tool_parts() {
        let message = Message {
            id: "m1".to_string(),
            thread_id: "t1".to_string(),
            role: MessageRole::Assistant,
            parts: vec![
                MessagePart::Tool {
                    tool: "web_search".to_string(),
                    tool_call_id: "call_1".to_string(),
                    state: PartState::Call,
                    input: Some(json!({"query": "tea"})),
                    output: None,
                },
                MessagePart::text("green "),
                MessagePart::text("tea"),
            ],
            created_at: chrono::Utc::now(),
        };

        assert_eq!(message.text(), "green tea");
    }
}
