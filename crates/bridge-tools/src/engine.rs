//! The tool pass: detect, execute, render.

use std::sync::Arc;

use crate::executor::ToolExecutor;
use crate::extract::{HeuristicExtractor, ToolCallExtractor};
use crate::render::render_results;

/// Runs the complete tool pass over a generated response
pub struct ToolEngine {
    extractor: Arc<dyn ToolCallExtractor>,
    executor: ToolExecutor,
}

impl ToolEngine {
    /// Create an engine with the default heuristic extractor
    #[must_use]
    pub fn new(executor: ToolExecutor) -> Self {
        Self {
            extractor: Arc::new(HeuristicExtractor),
            executor,
        }
    }

    /// Replace the extraction strategy
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn ToolCallExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Scan a response for tool intent, execute what it finds, and return
    /// the response with rendered results appended. Text without tool
    /// intent is returned unchanged.
    pub async fn augment(&self, text: &str) -> String {
        if !self.extractor.should_invoke(text) {
            return text.to_string();
        }

        let invocations = self.extractor.extract(text);
        if invocations.is_empty() {
            return text.to_string();
        }

        tracing::info!(
            count = invocations.len(),
            session = %self.executor.session_id(),
            "Executing extracted tool invocations"
        );

        let mut results = Vec::with_capacity(invocations.len());
        for invocation in &invocations {
            results.push(self.executor.execute(invocation).await);
        }

        format!("{}\n{}", text, render_results(&results))
    }
}
