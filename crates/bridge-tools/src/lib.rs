//! # Bridge Tools
//!
//! Lets a text-only completion model simulate file and shell operations.
//!
//! The flow mirrors how the bridge uses it: a generated response is scanned
//! for tool intent ([`extract`]), matched invocations run under a security
//! policy ([`executor`]), and results are rendered back into readable text
//! appended to the response ([`render`]). [`instructions`] supplies the
//! system prompt that teaches the model how to phrase tool intents.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod executor;
pub mod extract;
pub mod instructions;
pub mod invocation;
pub mod render;

pub use engine::ToolEngine;
pub use executor::ToolExecutor;
pub use extract::{HeuristicExtractor, ToolCallExtractor};
pub use instructions::inject_tool_instructions;
pub use invocation::{ToolInvocation, ToolOutput, ToolResult, ToolStatus};
pub use render::render_results;
