//! Shared application state.

use std::sync::Arc;

use bridge_backends::FormatConverter;
use bridge_config::BridgeConfig;
use bridge_core::{BridgeError, ChatBackend};
use bridge_resilience::{ResponseCache, RetryPolicy};
use bridge_tools::ToolEngine;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<BridgeConfig>,
    /// The generation backend
    pub backend: Arc<dyn ChatBackend>,
    /// Protocol converter
    pub converter: Arc<FormatConverter>,
    /// Retry policy for backend calls
    pub retry: Arc<RetryPolicy>,
    /// Response cache, when caching is enabled
    pub cache: Option<Arc<ResponseCache>>,
    /// Tool engine, when tool execution is enabled
    pub tools: Option<Arc<ToolEngine>>,
}

impl AppState {
    /// Start building state
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }
}

/// Builder for [`AppState`]
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<BridgeConfig>,
    backend: Option<Arc<dyn ChatBackend>>,
    retry: Option<RetryPolicy>,
    cache: Option<Arc<ResponseCache>>,
    tools: Option<Arc<ToolEngine>>,
}

impl AppStateBuilder {
    /// Set the configuration
    #[must_use]
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the generation backend (required)
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Attach a response cache
    #[must_use]
    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach a tool engine
    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolEngine>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Build the state.
    ///
    /// # Errors
    /// Returns a config error when no backend was provided.
    pub fn build(self) -> Result<AppState, BridgeError> {
        let config = self.config.unwrap_or_default();
        let backend = self
            .backend
            .ok_or_else(|| BridgeError::config("AppState requires a backend"))?;

        let converter = FormatConverter::new(
            config.backend.model.clone(),
            config.backend.display_model.clone(),
        );

        Ok(AppState {
            config: Arc::new(config),
            backend,
            converter: Arc::new(converter),
            retry: Arc::new(self.retry.unwrap_or_else(RetryPolicy::with_defaults)),
            cache: self.cache,
            tools: self.tools,
        })
    }
}
