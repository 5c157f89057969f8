//! # Bridge Backends
//!
//! Protocol translation and backend clients for the bridge.
//!
//! - [`convert`] — pure bidirectional mapping between the Anthropic
//!   Messages surface and OpenAI-style chat completions, including the
//!   streaming chunk-to-event translator.
//! - [`openai`] — a [`bridge_core::ChatBackend`] implementation speaking
//!   the OpenAI chat-completions protocol over HTTP and SSE.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod convert;
pub mod openai;

pub use convert::{approximate_tokens, FormatConverter, StreamTranslator};
pub use openai::{OpenAiBackend, OpenAiBackendConfig};
