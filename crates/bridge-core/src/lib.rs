//! # Bridge Core
//!
//! Core types, traits, and error handling for the LLM translation bridge.
//!
//! This crate provides the foundational pieces used throughout the bridge:
//! - Anthropic Messages API surface types (requests, responses, stream events)
//! - Backend-native chat completion types and the [`ChatBackend`] trait
//! - Error types and retryability classification

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod messages;
pub mod response;

// Re-export commonly used types
pub use backend::{
    BackendHealth, BackendModel, ChatBackend, ChatChunk, ChatMessage, ChatRequest, ChatResponse,
    ChatUsage, ChunkStream, HealthState,
};
pub use error::{BridgeError, BridgeResult};
pub use messages::{Content, ContentBlock, Message, MessagesRequest, Role};
pub use response::{
    ContentDelta, MessageDeltaBody, MessageStartBody, MessagesResponse, OutputUsage, ResponseBlock,
    StopReason, StreamEvent, Usage,
};
