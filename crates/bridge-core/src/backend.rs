//! Backend chat-completion types and the [`ChatBackend`] trait.
//!
//! A backend speaks an OpenAI-style chat-completion protocol. The trait
//! normalizes every backend to the same small surface: a buffered call, a
//! streaming call, model listing, and a health probe. Implementations keep
//! their wire structs private and translate at the boundary.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;
use crate::messages::Role;

/// Request forwarded to a chat-completion backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Backend model identifier
    pub model: String,
    /// Conversation in chat-completion form
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Request a streamed response
    #[serde(default)]
    pub stream: bool,
}

/// A single chat-completion message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role
    pub role: Role,
    /// Plain-text content
    pub content: String,
}

impl ChatMessage {
    /// Create a message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Normalized buffered result from a backend
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated text (first choice)
    pub text: String,
    /// Backend finish reason (`stop`, `length`, ...), when provided
    pub finish_reason: Option<String>,
    /// Backend token accounting, when provided
    pub usage: Option<ChatUsage>,
}

/// Backend-reported token usage
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChatUsage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
}

/// Normalized streaming fragment from a backend
#[derive(Debug, Clone)]
pub struct ChatChunk {
    /// Text fragment (may be empty on the final chunk)
    pub delta: String,
    /// Finish reason, present on the final chunk
    pub finish_reason: Option<String>,
}

/// Boxed stream of normalized chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = BridgeResult<ChatChunk>> + Send>>;

/// A model advertised by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendModel {
    /// Model identifier
    pub id: String,
}

/// Health probe result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendHealth {
    /// Probe outcome
    pub state: HealthState,
    /// Detail for degraded/unhealthy states
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl BackendHealth {
    /// A healthy probe result
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            state: HealthState::Healthy,
            detail: None,
        }
    }

    /// An unhealthy probe result with detail
    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            state: HealthState::Unhealthy,
            detail: Some(detail.into()),
        }
    }
}

/// Component health state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Component responding normally
    Healthy,
    /// Component unreachable or failing
    Unhealthy,
}

/// Abstraction over OpenAI-style chat-completion backends
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short backend name for logs and health output
    fn name(&self) -> &str;

    /// Execute a buffered chat completion
    async fn chat(&self, request: &ChatRequest) -> BridgeResult<ChatResponse>;

    /// Execute a streaming chat completion
    async fn chat_stream(&self, request: &ChatRequest) -> BridgeResult<ChunkStream>;

    /// List models the backend advertises
    async fn list_models(&self) -> BridgeResult<Vec<BackendModel>>;

    /// Probe backend reachability
    async fn health_check(&self) -> BackendHealth;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_wire_shape() {
        let request = ChatRequest {
            model: "llama3.1-8b".to_string(),
            messages: vec![
                ChatMessage::new(Role::System, "be brief"),
                ChatMessage::new(Role::User, "hi"),
            ],
            max_tokens: Some(100),
            temperature: None,
            stream: false,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["max_tokens"], 100);
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn test_health_serialization() {
        let health = BackendHealth::unhealthy("connection refused");
        let value = serde_json::to_value(&health).unwrap();
        assert_eq!(value["state"], "unhealthy");
        assert_eq!(value["detail"], "connection refused");

        let value = serde_json::to_value(BackendHealth::healthy()).unwrap();
        assert_eq!(value, json!({"state": "healthy"}));
    }
}
