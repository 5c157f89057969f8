//! Anthropic Messages API request types.
//!
//! This module defines the inbound surface of the bridge: the request shape
//! a Messages-API client sends, including the two content encodings (plain
//! string or a sequence of typed content blocks).

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Inbound request to `POST /v1/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    /// Model requested by the client (may be overridden by the backend config)
    pub model: String,

    /// Ordered conversation messages
    pub messages: Vec<Message>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Enable server-sent-event streaming
    #[serde(default)]
    pub stream: bool,
}

impl MessagesRequest {
    /// Validate the request before any backend work.
    ///
    /// # Errors
    /// Returns a validation error when the conversation is empty or no
    /// message carries non-empty text content.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.messages.is_empty() {
            return Err(BridgeError::validation(
                "messages cannot be empty",
                Some("messages".to_string()),
            ));
        }

        if !self
            .messages
            .iter()
            .any(|m| !m.content.extract_text().trim().is_empty())
        {
            return Err(BridgeError::validation(
                "at least one message must have non-empty content",
                Some("messages".to_string()),
            ));
        }

        Ok(())
    }

    /// Whether the conversation already contains a system message
    #[must_use]
    pub fn has_system_message(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::System)
    }
}

/// A single conversation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message
    pub role: Role,
    /// Message content, plain text or content blocks
    pub content: Content,
}

impl Message {
    /// Create a user message from plain text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Plain(text.into()),
        }
    }

    /// Create an assistant message from plain text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Plain(text.into()),
        }
    }

    /// Create a system message from plain text
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Plain(text.into()),
        }
    }
}

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// End-user turn
    User,
    /// Model turn
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Message content: plain text or a sequence of typed blocks.
///
/// The Messages API accepts both encodings; `extract_text` is the single
/// projection point that flattens either form into the text the rest of the
/// bridge operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// A plain string body
    Plain(String),
    /// A sequence of typed content blocks
    Blocks(Vec<ContentBlock>),
}

impl Content {
    /// Flatten the content into plain text.
    ///
    /// Block sequences concatenate their text blocks with newlines;
    /// non-text blocks are dropped.
    #[must_use]
    pub fn extract_text(&self) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::Other => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A typed content block within a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// A text block
    Text {
        /// Block payload
        text: String,
    },
    /// Any block type this bridge does not process (images, documents)
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_content_roundtrip() {
        let msg: Message = serde_json::from_value(json!({
            "role": "user",
            "content": "hello"
        }))
        .unwrap();
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content.extract_text(), "hello");
    }

    #[test]
    fn test_block_content_extraction() {
        let msg: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "source": {"data": "..."}},
                {"type": "text", "text": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(msg.content.extract_text(), "first\nsecond");
    }

    #[test]
    fn test_empty_messages_rejected() {
        let request = MessagesRequest {
            model: "claude-3-sonnet".to_string(),
            messages: vec![],
            max_tokens: None,
            temperature: None,
            stream: false,
        };
        let err = request.validate().unwrap_err();
        assert!(matches!(err, BridgeError::Validation { .. }));
    }

    #[test]
    fn test_whitespace_only_content_rejected() {
        let request = MessagesRequest {
            model: "claude-3-sonnet".to_string(),
            messages: vec![Message::user("   ")],
            max_tokens: None,
            temperature: None,
            stream: false,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_valid_request_passes() {
        let request = MessagesRequest {
            model: "claude-3-sonnet".to_string(),
            messages: vec![Message::system("be brief"), Message::user("hi")],
            max_tokens: Some(256),
            temperature: Some(0.7),
            stream: false,
        };
        assert!(request.validate().is_ok());
        assert!(request.has_system_message());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
