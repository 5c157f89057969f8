//! Tool invocation and result types.

/// A single tool operation extracted from model output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    /// Run a shell command
    Bash {
        /// The command line
        command: String,
    },
    /// Create (or overwrite) a file
    FileCreate {
        /// Target path, relative to the executor root
        path: String,
        /// Full file content
        content: String,
    },
    /// Read a file, optionally a 1-based inclusive line range
    FileView {
        /// Target path
        path: String,
        /// Optional `(start, end)` line range
        range: Option<(usize, usize)>,
    },
    /// Replace the first occurrence of an exact string
    FileReplace {
        /// Target path
        path: String,
        /// Exact string to find
        old: String,
        /// Replacement
        new: String,
    },
}

/// Terminal status of an executed invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    /// Operation completed normally
    Succeeded,
    /// Operation ran but failed
    Failed,
    /// Security policy refused to run the operation
    Blocked,
}

/// Result of one invocation. Never persisted; rendered into the response
/// text and discarded.
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Terminal status
    pub status: ToolStatus,
    /// Captured output
    pub output: ToolOutput,
}

/// Output payload of a tool result
#[derive(Debug, Clone)]
pub enum ToolOutput {
    /// Shell command capture
    Command {
        /// The command that was (or would have been) run
        command: String,
        /// Process exit code (124 on timeout, 1 when blocked)
        exit_code: i32,
        /// Captured stdout
        stdout: String,
        /// Captured stderr, or the block/failure reason
        stderr: String,
    },
    /// File operation outcome message
    FileOp {
        /// Human-readable result or error description
        message: String,
    },
}

impl ToolResult {
    /// A blocked command result (exit code 1, reason in stderr, no
    /// subprocess spawned)
    pub fn blocked_command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Blocked,
            output: ToolOutput::Command {
                command: command.into(),
                exit_code: 1,
                stdout: String::new(),
                stderr: reason.into(),
            },
        }
    }

    /// A failed file operation
    pub fn file_error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Failed,
            output: ToolOutput::FileOp {
                message: message.into(),
            },
        }
    }

    /// A successful file operation
    pub fn file_ok(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Succeeded,
            output: ToolOutput::FileOp {
                message: message.into(),
            },
        }
    }
}
