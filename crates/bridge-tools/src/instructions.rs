//! Tool-instruction system prompt injection.
//!
//! Backends that simulate tools need to be told how to phrase tool intent
//! so the extractor can find it. When the conversation has no system
//! message, one is prepended; an existing system message is left alone.

use bridge_core::{Message, MessagesRequest};

/// System prompt teaching the model the phrasing the extractor recognizes
pub const TOOL_SYSTEM_PROMPT: &str = "You are a helpful coding assistant with access to system tools.

When you need to execute commands or work with files, be explicit about your actions:
- For bash commands: Write ```bash\ncommand\n``` blocks
- For file creation: Say \"I'll create a file named 'filename'\" and include the content
- Always show the actual commands you want to execute in code blocks
- Be specific about file paths and command syntax

You have access to bash execution and file operations.";

/// Prepend the tool system prompt when the conversation has none
pub fn inject_tool_instructions(request: &mut MessagesRequest) {
    if request.has_system_message() {
        return;
    }
    request
        .messages
        .insert(0, Message::system(TOOL_SYSTEM_PROMPT));
}
