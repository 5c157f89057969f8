//! Sandboxed execution of tool invocations.
//!
//! Security policy:
//! - Shell commands are screened against a denylist of destructive
//!   patterns before any subprocess is spawned, capped at 1000 characters,
//!   and bounded by a 30-second timeout (exit code 124).
//! - Every file path must lexically resolve inside the executor root and
//!   must not contain a sensitive fragment (`.ssh`, `.git`, `.env`,
//!   private-key filenames). Violations yield a blocked result with no
//!   filesystem access attempted.
//!
//! Failures inside one invocation never abort the others; each is captured
//! in its own [`ToolResult`].

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;
use uuid::Uuid;

use crate::invocation::{ToolInvocation, ToolOutput, ToolResult, ToolStatus};

/// Maximum accepted shell command length
const MAX_COMMAND_LEN: usize = 1000;
/// Shell command deadline
const BASH_TIMEOUT: Duration = Duration::from_secs(30);
/// Exit code reported when the deadline elapses
const TIMEOUT_EXIT_CODE: i32 = 124;

static DENYLIST: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)rm\s+-rf\s+/",
        r"(?i)rm\s+-rf\s+\*",
        r"(?i)\bformat\b",
        r"(?i)\bfdisk\b",
        r"(?i)\bmkfs\b",
        r"(?i)dd\s+if=",
        r"(?i):\(\)\s*\{\s*:\|:&\s*\};:",
        r"(?i)chmod\s+-R\s+777\s+/",
        r"(?i)chown\s+-R",
        r"(?i)\bpasswd\b",
        r"(?i)sudo\s+su",
        r"(?i)\bsu\s+-",
        r"(?i)curl.*169\.254\.169\.254",
        r"(?i)>\s*/dev/sd[a-z]",
        r"(?i)mkfs\.",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("denylist pattern must compile"))
    .collect()
});

/// Path fragments that are never accessible to file tools
const SENSITIVE_FRAGMENTS: &[&str] = &[".ssh", ".git", ".env", "id_rsa", "id_dsa", "id_ed25519"];

/// Executes tool invocations under the security policy
pub struct ToolExecutor {
    root: PathBuf,
    session_id: Uuid,
}

impl ToolExecutor {
    /// Create an executor rooted at the given working directory.
    ///
    /// A relative root is resolved against the process working directory so
    /// the containment check compares absolute paths.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = match (root.is_absolute(), std::env::current_dir()) {
            (false, Ok(cwd)) => cwd.join(&root),
            _ => root,
        };
        let root = lexical_normalize(&root).unwrap_or(root);

        Self {
            root,
            session_id: Uuid::new_v4(),
        }
    }

    /// Identifier for this executor's tool session
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Dispatch one invocation
    pub async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        match invocation {
            ToolInvocation::Bash { command } => self.bash(command).await,
            ToolInvocation::FileCreate { path, content } => self.create_file(path, content).await,
            ToolInvocation::FileView { path, range } => self.view_file(path, *range).await,
            ToolInvocation::FileReplace { path, old, new } => {
                self.replace_in_file(path, old, new).await
            }
        }
    }

    /// Run a shell command under the denylist, length cap, and timeout
    pub async fn bash(&self, command: &str) -> ToolResult {
        self.bash_with_deadline(command, BASH_TIMEOUT).await
    }

    async fn bash_with_deadline(&self, command: &str, deadline: Duration) -> ToolResult {
        if command.len() > MAX_COMMAND_LEN {
            return ToolResult {
                status: ToolStatus::Failed,
                output: ToolOutput::Command {
                    command: command.to_string(),
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: format!("Command too long (max {MAX_COMMAND_LEN} characters)"),
                },
            };
        }

        if DENYLIST.iter().any(|p| p.is_match(command)) {
            tracing::warn!(command = %command, "Command blocked by security policy");
            return ToolResult::blocked_command(
                command,
                "Security: Command blocked by security policy",
            );
        }

        tracing::info!(command = %command, "Executing bash command");

        // kill_on_drop so an elapsed deadline also kills the shell instead
        // of leaking it past the reported exit 124
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.root)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(deadline, child).await {
            Ok(Ok(output)) => {
                let exit_code = output.status.code().unwrap_or(1);
                ToolResult {
                    status: if exit_code == 0 {
                        ToolStatus::Succeeded
                    } else {
                        ToolStatus::Failed
                    },
                    output: ToolOutput::Command {
                        command: command.to_string(),
                        exit_code,
                        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    },
                }
            }
            Ok(Err(error)) => ToolResult {
                status: ToolStatus::Failed,
                output: ToolOutput::Command {
                    command: command.to_string(),
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: error.to_string(),
                },
            },
            Err(_) => ToolResult {
                status: ToolStatus::Failed,
                output: ToolOutput::Command {
                    command: command.to_string(),
                    exit_code: TIMEOUT_EXIT_CODE,
                    stdout: String::new(),
                    stderr: format!("Command timed out after {} seconds", deadline.as_secs()),
                },
            },
        }
    }

    /// Create or overwrite a file (overwrite is unconditional)
    pub async fn create_file(&self, path: &str, content: &str) -> ToolResult {
        let resolved = match self.validate_path(path) {
            Ok(p) => p,
            Err(reason) => return ToolResult::file_error(reason),
        };

        match tokio::fs::write(&resolved, content).await {
            Ok(()) => ToolResult::file_ok(format!("File created successfully at: {path}")),
            Err(error) => ToolResult::file_error(format!("Failed to create file: {error}")),
        }
    }

    /// Read a file, optionally restricted to a 1-based inclusive line range
    pub async fn view_file(&self, path: &str, range: Option<(usize, usize)>) -> ToolResult {
        let resolved = match self.validate_path(path) {
            Ok(p) => p,
            Err(reason) => return ToolResult::file_error(reason),
        };

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => content,
            Err(error) => {
                return ToolResult::file_error(format!("Failed to read file: {error}"));
            }
        };

        let content = match range {
            Some((start, end)) => {
                let lines: Vec<&str> = content.split('\n').collect();
                let start = start.saturating_sub(1);
                let end = end.min(lines.len());
                if start >= lines.len() {
                    String::new()
                } else {
                    lines[start..end].join("\n")
                }
            }
            None => content,
        };

        ToolResult::file_ok(content)
    }

    /// Replace the first occurrence of `old` with `new`; exact match only
    pub async fn replace_in_file(&self, path: &str, old: &str, new: &str) -> ToolResult {
        let resolved = match self.validate_path(path) {
            Ok(p) => p,
            Err(reason) => return ToolResult::file_error(reason),
        };

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => content,
            Err(error) => {
                return ToolResult::file_error(format!("Failed to read file: {error}"));
            }
        };

        if !content.contains(old) {
            let preview: String = old.chars().take(50).collect();
            return ToolResult::file_error(format!("String not found: {preview}..."));
        }

        let updated = content.replacen(old, new, 1);
        match tokio::fs::write(&resolved, updated).await {
            Ok(()) => ToolResult::file_ok(format!("String replaced successfully in {path}")),
            Err(error) => ToolResult::file_error(format!("Failed to replace string: {error}")),
        }
    }

    /// Lexically resolve a path and enforce the containment policy.
    ///
    /// Normalization is purely lexical (`..` pops a component, escaping the
    /// root is rejected); no symlinks are followed before the check.
    fn validate_path(&self, path: &str) -> Result<PathBuf, String> {
        if path.is_empty() {
            return Err("Invalid file path: access denied".to_string());
        }

        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let Some(normalized) = lexical_normalize(&joined) else {
            return Err("Invalid file path: access denied".to_string());
        };

        if !normalized.starts_with(&self.root) {
            return Err("Invalid file path: access denied".to_string());
        }

        let as_str = normalized.to_string_lossy();
        if SENSITIVE_FRAGMENTS.iter().any(|f| as_str.contains(f)) {
            return Err("Invalid file path: access denied".to_string());
        }

        Ok(normalized)
    }
}

/// Resolve `.` and `..` components lexically. Returns `None` when `..`
/// would pop past the start of the path.
fn lexical_normalize(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    Some(normalized)
}
