//! Conversion between the Anthropic Messages surface and the backend
//! chat-completion protocol.
//!
//! All mapping here is pure: no I/O, no clock reads beyond message id
//! generation. The converter owns the model-name policy (the configured
//! backend model is always sent upstream; the configured display model is
//! always echoed back) and the token-count fallback used when a backend
//! reports no usage.

use bridge_core::{
    ChatChunk, ChatMessage, ChatRequest, ChatResponse, ContentDelta, Message, MessageDeltaBody,
    MessageStartBody, MessagesRequest, MessagesResponse, OutputUsage, ResponseBlock, StopReason,
    StreamEvent, Usage,
};
use tracing::info;

/// Approximate a token count as the whitespace-separated word count.
///
/// Used only when the backend omits usage. This is an approximation, not
/// billing-grade accounting.
#[must_use]
pub fn approximate_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

/// Translates requests and responses between the two protocols
#[derive(Debug, Clone)]
pub struct FormatConverter {
    backend_model: String,
    display_model: String,
}

impl FormatConverter {
    /// Create a converter with the backend model to send upstream and the
    /// display model to echo to clients
    pub fn new(backend_model: impl Into<String>, display_model: impl Into<String>) -> Self {
        Self {
            backend_model: backend_model.into(),
            display_model: display_model.into(),
        }
    }

    /// Model name echoed to clients
    #[must_use]
    pub fn display_model(&self) -> &str {
        &self.display_model
    }

    /// Map an inbound Messages request to a backend chat request.
    ///
    /// The caller-requested model is replaced by the configured backend
    /// model; the override is logged so operators can see what clients ask
    /// for.
    #[must_use]
    pub fn to_backend_request(&self, request: &MessagesRequest) -> ChatRequest {
        if request.model != self.backend_model {
            info!(
                requested = %request.model,
                using = %self.backend_model,
                "Overriding requested model"
            );
        }

        ChatRequest {
            model: self.backend_model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| ChatMessage::new(m.role, m.content.extract_text()))
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: request.stream,
        }
    }

    /// Map a buffered backend response to the Messages response shape.
    ///
    /// When the backend reported no usage, input tokens fall back to the
    /// word count of the request messages and output tokens to the word
    /// count of the generated text.
    #[must_use]
    pub fn to_client_response(
        &self,
        messages: &[Message],
        response: &ChatResponse,
    ) -> MessagesResponse {
        let usage = self.usage_for(messages, response);

        let mut client_response =
            MessagesResponse::text(self.display_model.clone(), response.text.clone(), usage);
        client_response.stop_reason = Some(map_finish_reason(response.finish_reason.as_deref()));
        client_response
    }

    fn usage_for(&self, messages: &[Message], response: &ChatResponse) -> Usage {
        response.usage.map_or_else(
            || {
                let input: u32 = messages
                    .iter()
                    .map(|m| approximate_tokens(&m.content.extract_text()))
                    .sum();
                Usage::new(input, approximate_tokens(&response.text))
            },
            |usage| Usage::new(usage.prompt_tokens, usage.completion_tokens),
        )
    }

    /// Input-side token count for a conversation, used to open a stream
    #[must_use]
    pub fn input_tokens(&self, messages: &[Message]) -> u32 {
        messages
            .iter()
            .map(|m| approximate_tokens(&m.content.extract_text()))
            .sum()
    }
}

/// Map a backend finish reason onto a stop reason
#[must_use]
pub fn map_finish_reason(finish_reason: Option<&str>) -> StopReason {
    match finish_reason {
        Some("length") => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    }
}

/// Stateful translator from backend chunks to the Messages event sequence.
///
/// Guarantees the fixed event order: `message_start`,
/// `content_block_start`, zero or more `content_block_delta`,
/// `content_block_stop`, `message_delta`, `message_stop`. The envelope
/// events are emitted lazily with the first chunk (or at finish when the
/// backend produced nothing).
#[derive(Debug)]
pub struct StreamTranslator {
    model: String,
    input_tokens: u32,
    started: bool,
    generated: String,
    finish_reason: Option<String>,
}

impl StreamTranslator {
    /// Create a translator for one streamed response
    pub fn new(model: impl Into<String>, input_tokens: u32) -> Self {
        Self {
            model: model.into(),
            input_tokens,
            started: false,
            generated: String::new(),
            finish_reason: None,
        }
    }

    fn opening_events(&mut self) -> Vec<StreamEvent> {
        if self.started {
            return Vec::new();
        }
        self.started = true;
        vec![
            StreamEvent::MessageStart {
                message: MessageStartBody::new(self.model.clone(), self.input_tokens),
            },
            StreamEvent::ContentBlockStart {
                index: 0,
                content_block: ResponseBlock::Text {
                    text: String::new(),
                },
            },
        ]
    }

    /// Translate one backend chunk into zero or more events
    pub fn on_chunk(&mut self, chunk: &ChatChunk) -> Vec<StreamEvent> {
        let mut events = self.opening_events();

        if !chunk.delta.is_empty() {
            self.generated.push_str(&chunk.delta);
            events.push(StreamEvent::ContentBlockDelta {
                index: 0,
                delta: ContentDelta::TextDelta {
                    text: chunk.delta.clone(),
                },
            });
        }

        if let Some(reason) = &chunk.finish_reason {
            self.finish_reason = Some(reason.clone());
        }

        events
    }

    /// Emit the closing event sequence
    pub fn finish(mut self) -> Vec<StreamEvent> {
        let mut events = self.opening_events();

        events.push(StreamEvent::ContentBlockStop { index: 0 });
        events.push(StreamEvent::MessageDelta {
            delta: MessageDeltaBody {
                stop_reason: Some(map_finish_reason(self.finish_reason.as_deref())),
                stop_sequence: None,
            },
            usage: OutputUsage {
                output_tokens: approximate_tokens(&self.generated),
            },
        });
        events.push(StreamEvent::MessageStop);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::{ChatUsage, Role};

    fn converter() -> FormatConverter {
        FormatConverter::new("llama3.1-8b", "claude-3-sonnet-20240229")
    }

    fn request(text: &str) -> MessagesRequest {
        MessagesRequest {
            model: "claude-3-opus".to_string(),
            messages: vec![Message::user(text)],
            max_tokens: Some(100),
            temperature: Some(0.5),
            stream: false,
        }
    }

    #[test]
    fn test_model_override() {
        let backend_request = converter().to_backend_request(&request("hi"));
        assert_eq!(backend_request.model, "llama3.1-8b");
        assert_eq!(backend_request.max_tokens, Some(100));
        assert_eq!(backend_request.messages[0].role, Role::User);
        assert_eq!(backend_request.messages[0].content, "hi");
    }

    #[test]
    fn test_response_echoes_display_model() {
        let response = ChatResponse {
            text: "hello there".to_string(),
            finish_reason: Some("stop".to_string()),
            usage: Some(ChatUsage {
                prompt_tokens: 4,
                completion_tokens: 2,
            }),
        };
        let client = converter().to_client_response(&request("hi").messages, &response);

        assert_eq!(client.model, "claude-3-sonnet-20240229");
        assert_eq!(client.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(client.usage.input_tokens, 4);
        assert_eq!(client.usage.output_tokens, 2);
        assert_eq!(client.text_content(), "hello there");
    }

    #[test]
    fn test_word_count_fallback_when_usage_missing() {
        let response = ChatResponse {
            text: "three word answer".to_string(),
            finish_reason: None,
            usage: None,
        };
        let client = converter().to_client_response(&request("two words").messages, &response);

        assert_eq!(client.usage.input_tokens, 2);
        assert_eq!(client.usage.output_tokens, 3);
    }

    #[test]
    fn test_length_maps_to_max_tokens() {
        assert_eq!(map_finish_reason(Some("length")), StopReason::MaxTokens);
        assert_eq!(map_finish_reason(Some("stop")), StopReason::EndTurn);
        assert_eq!(map_finish_reason(None), StopReason::EndTurn);
    }

    #[test]
    fn test_text_round_trip_is_idempotent() {
        // Converting a backend response out and feeding the same text back
        // through the converter must preserve the text payload exactly.
        let conv = converter();
        let response = ChatResponse {
            text: "stable payload".to_string(),
            finish_reason: Some("stop".to_string()),
            usage: None,
        };
        let messages = request("q").messages;
        let first = conv.to_client_response(&messages, &response);

        let again = ChatResponse {
            text: first.text_content(),
            finish_reason: Some("stop".to_string()),
            usage: None,
        };
        let second = conv.to_client_response(&messages, &again);
        assert_eq!(first.text_content(), second.text_content());
    }

    #[test]
    fn test_stream_event_order() {
        let mut translator = StreamTranslator::new("claude-3-sonnet-20240229", 5);

        let mut events = Vec::new();
        events.extend(translator.on_chunk(&ChatChunk {
            delta: "Hel".to_string(),
            finish_reason: None,
        }));
        events.extend(translator.on_chunk(&ChatChunk {
            delta: "lo".to_string(),
            finish_reason: None,
        }));
        events.extend(translator.on_chunk(&ChatChunk {
            delta: String::new(),
            finish_reason: Some("stop".to_string()),
        }));
        events.extend(translator.finish());

        let names: Vec<&str> = events.iter().map(StreamEvent::event_name).collect();
        assert_eq!(
            names,
            vec![
                "message_start",
                "content_block_start",
                "content_block_delta",
                "content_block_delta",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );

        match &events[2] {
            StreamEvent::ContentBlockDelta { delta, .. } => match delta {
                ContentDelta::TextDelta { text } => assert_eq!(text, "Hel"),
            },
            other => panic!("unexpected event: {other:?}"),
        }

        match &events[5] {
            StreamEvent::MessageDelta { delta, usage } => {
                assert_eq!(delta.stop_reason, Some(StopReason::EndTurn));
                assert_eq!(usage.output_tokens, 1); // "Hello" is one word
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_empty_stream_still_produces_envelope() {
        let translator = StreamTranslator::new("m", 0);
        let names: Vec<&str> = translator
            .finish()
            .iter()
            .map(StreamEvent::event_name)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "message_start",
                "content_block_start",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );
    }

    #[test]
    fn test_approximate_tokens() {
        assert_eq!(approximate_tokens(""), 0);
        assert_eq!(approximate_tokens("one"), 1);
        assert_eq!(approximate_tokens("  spaced   out  words "), 3);
    }
}
