//! Rendering of tool results back into response text.
//!
//! Results are appended to the model's response as readable blocks, so the
//! client sees both what the model said and what actually happened.

use crate::invocation::{ToolOutput, ToolResult};

/// Render executed results into the text block appended to a response
#[must_use]
pub fn render_results(results: &[ToolResult]) -> String {
    results
        .iter()
        .map(render_one)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_one(result: &ToolResult) -> String {
    match &result.output {
        ToolOutput::Command {
            command,
            exit_code,
            stdout,
            stderr,
        } => format!(
            "\n**Bash Execution:**\n```\nCommand: {command}\nExit code: {exit_code}\nOutput: {stdout}\nError: {stderr}\n```"
        ),
        ToolOutput::FileOp { message } => match result.status {
            crate::invocation::ToolStatus::Succeeded => {
                format!("\n**File Operation:** {message}")
            }
            _ => format!("\n**File Operation Error:** {message}"),
        },
    }
}
