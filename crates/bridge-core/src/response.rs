//! Anthropic Messages API response and stream-event types.
//!
//! These are the wire shapes the bridge emits back to the client, both for
//! buffered responses and for the server-sent-event stream.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Buffered response from `POST /v1/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    /// Message identifier (`msg_{unix_ts}`)
    pub id: String,
    /// Always `"message"`
    #[serde(rename = "type")]
    pub kind: String,
    /// Always `"assistant"`
    pub role: String,
    /// Response content blocks
    pub content: Vec<ResponseBlock>,
    /// Model name echoed to the client
    pub model: String,
    /// Why generation stopped
    pub stop_reason: Option<StopReason>,
    /// Stop sequence that triggered the stop; this bridge never sets one
    pub stop_sequence: Option<String>,
    /// Token accounting
    pub usage: Usage,
}

impl MessagesResponse {
    /// Build a single-text-block assistant response
    #[must_use]
    pub fn text(model: impl Into<String>, text: impl Into<String>, usage: Usage) -> Self {
        Self {
            id: generate_message_id(),
            kind: "message".to_string(),
            role: "assistant".to_string(),
            content: vec![ResponseBlock::Text { text: text.into() }],
            model: model.into(),
            stop_reason: Some(StopReason::EndTurn),
            stop_sequence: None,
            usage,
        }
    }

    /// Concatenated text of all content blocks
    #[must_use]
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                ResponseBlock::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Generate a `msg_{unix_ts}` message identifier
#[must_use]
pub fn generate_message_id() -> String {
    format!("msg_{}", Utc::now().timestamp())
}

/// A content block in a response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    /// Generated text
    Text {
        /// Block payload
        text: String,
    },
}

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the assistant turn
    EndTurn,
    /// Output token limit reached
    MaxTokens,
    /// A stop sequence matched
    StopSequence,
}

/// Token accounting attached to responses and final stream deltas
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub input_tokens: u32,
    /// Tokens generated
    pub output_tokens: u32,
}

impl Usage {
    /// Create a usage record
    #[must_use]
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// Server-sent events emitted on the streaming path.
///
/// The serialized `type` field doubles as the SSE event name; the emission
/// order per response is fixed: `message_start`, `content_block_start`, one
/// or more `content_block_delta`, `content_block_stop`, `message_delta`,
/// `message_stop`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Opens the message envelope
    MessageStart {
        /// Partial message with empty content
        message: MessageStartBody,
    },
    /// Opens a content block
    ContentBlockStart {
        /// Block index
        index: u32,
        /// Empty text block placeholder
        content_block: ResponseBlock,
    },
    /// A text fragment
    ContentBlockDelta {
        /// Block index
        index: u32,
        /// The fragment
        delta: ContentDelta,
    },
    /// Closes a content block
    ContentBlockStop {
        /// Block index
        index: u32,
    },
    /// Final metadata: stop reason and output token count
    MessageDelta {
        /// Stop reason payload
        delta: MessageDeltaBody,
        /// Output-side usage
        usage: OutputUsage,
    },
    /// Closes the message
    MessageStop,
}

impl StreamEvent {
    /// SSE event name for this event (matches the serialized `type` field)
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::MessageStart { .. } => "message_start",
            Self::ContentBlockStart { .. } => "content_block_start",
            Self::ContentBlockDelta { .. } => "content_block_delta",
            Self::ContentBlockStop { .. } => "content_block_stop",
            Self::MessageDelta { .. } => "message_delta",
            Self::MessageStop => "message_stop",
        }
    }
}

/// Partial message carried by `message_start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageStartBody {
    /// Message identifier
    pub id: String,
    /// Always `"message"`
    #[serde(rename = "type")]
    pub kind: String,
    /// Always `"assistant"`
    pub role: String,
    /// Always empty at start
    pub content: Vec<ResponseBlock>,
    /// Model name echoed to the client
    pub model: String,
    /// Unset at start
    pub stop_reason: Option<StopReason>,
    /// Unset at start
    pub stop_sequence: Option<String>,
    /// Input-side usage (output still zero)
    pub usage: Usage,
}

impl MessageStartBody {
    /// Build the opening envelope for a stream
    #[must_use]
    pub fn new(model: impl Into<String>, input_tokens: u32) -> Self {
        Self {
            id: generate_message_id(),
            kind: "message".to_string(),
            role: "assistant".to_string(),
            content: Vec::new(),
            model: model.into(),
            stop_reason: None,
            stop_sequence: None,
            usage: Usage::new(input_tokens, 0),
        }
    }
}

/// Text fragment payload of `content_block_delta`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    /// A text fragment
    TextDelta {
        /// The fragment
        text: String,
    },
}

/// Payload of `message_delta`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeltaBody {
    /// Final stop reason
    pub stop_reason: Option<StopReason>,
    /// Always null for this bridge
    pub stop_sequence: Option<String>,
}

/// Output-side usage attached to `message_delta`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OutputUsage {
    /// Tokens generated
    pub output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shape() {
        let response = MessagesResponse::text("my-model", "Hello!", Usage::new(3, 1));
        let value = serde_json::to_value(&response).unwrap();

        assert!(value["id"].as_str().unwrap().starts_with("msg_"));
        assert_eq!(value["type"], "message");
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "Hello!");
        assert_eq!(value["stop_reason"], "end_turn");
        assert!(value["stop_sequence"].is_null());
        assert_eq!(value["usage"]["input_tokens"], 3);
        assert_eq!(value["usage"]["output_tokens"], 1);
    }

    #[test]
    fn test_stream_event_serialization() {
        let event = StreamEvent::ContentBlockDelta {
            index: 0,
            delta: ContentDelta::TextDelta {
                text: "Hel".to_string(),
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "content_block_delta");
        assert_eq!(value["index"], 0);
        assert_eq!(value["delta"]["type"], "text_delta");
        assert_eq!(value["delta"]["text"], "Hel");
        assert_eq!(event.event_name(), "content_block_delta");
    }

    #[test]
    fn test_message_start_body() {
        let body = MessageStartBody::new("my-model", 12);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["usage"]["input_tokens"], 12);
        assert_eq!(value["usage"]["output_tokens"], 0);
        assert!(value["content"].as_array().unwrap().is_empty());
        assert!(value["stop_reason"].is_null());
    }

    #[test]
    fn test_stop_reason_encoding() {
        assert_eq!(
            serde_json::to_value(StopReason::EndTurn).unwrap(),
            "end_turn"
        );
        assert_eq!(
            serde_json::to_value(StopReason::MaxTokens).unwrap(),
            "max_tokens"
        );
    }
}
