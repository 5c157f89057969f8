//! Trigger detection and invocation extraction from model text.
//!
//! Extraction is heuristic by design: the backend models are text-only, so
//! tool intent arrives as fenced code blocks and stock phrases rather than
//! a structured protocol. The heuristics can over- and under-match; the
//! trait seam exists so a structured extractor can replace them if a
//! backend gains native function calling.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::invocation::ToolInvocation;

static TRIGGER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)```bash\n(.*?)\n```",
        r"(?i)I'll (run|execute|create|write|edit)",
        r"(?i)Let me (run|execute|create|write|edit)",
        r"(?i)I need to (run|execute|create|write|edit)",
        r"(?i)I'm going to (run|execute|create|write|edit)",
        r"(?i)Creating? (a )?file",
        r"(?i)Writing (a )?file",
        r"(?i)Running (the )?command",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("trigger pattern must compile"))
    .collect()
});

static BASH_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```bash\n(.*?)\n```").expect("bash pattern must compile"));

static FILE_CREATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)creat[ei]ng?\s+.*file.*named?\s+"([^"]+)""#)
        .expect("file-create pattern must compile")
});

static FILE_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)with.*content\s+"([^"]+)""#).expect("file-content pattern must compile")
});

/// Strategy seam for recognizing tool intent in generated text
pub trait ToolCallExtractor: Send + Sync {
    /// Whether the text contains any tool intent at all
    fn should_invoke(&self, text: &str) -> bool;

    /// Extract concrete invocations, in order of appearance
    fn extract(&self, text: &str) -> Vec<ToolInvocation>;
}

/// Pattern-based extractor: fenced bash blocks plus phrase-based file
/// creation
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicExtractor;

impl ToolCallExtractor for HeuristicExtractor {
    fn should_invoke(&self, text: &str) -> bool {
        TRIGGER_PATTERNS.iter().any(|p| p.is_match(text))
    }

    fn extract(&self, text: &str) -> Vec<ToolInvocation> {
        // Collected with their match offsets so invocations come out in
        // order of appearance, which execution must preserve
        let mut found: Vec<(usize, ToolInvocation)> = Vec::new();

        for capture in BASH_BLOCK.captures_iter(text) {
            let command = capture[1].trim();
            if !command.is_empty() {
                let offset = capture.get(0).map_or(0, |m| m.start());
                found.push((
                    offset,
                    ToolInvocation::Bash {
                        command: command.to_string(),
                    },
                ));
            }
        }

        if let Some(capture) = FILE_CREATE.captures(text) {
            let path = capture[1].to_string();
            let content = FILE_CONTENT
                .captures(text)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            let offset = capture.get(0).map_or(0, |m| m.start());
            found.push((offset, ToolInvocation::FileCreate { path, content }));
        }

        found.sort_by_key(|(offset, _)| *offset);
        found.into_iter().map(|(_, invocation)| invocation).collect()
    }
}
