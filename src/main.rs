//! # LLM Bridge
//!
//! Anthropic-compatible translation gateway for OpenAI-style LLM backends.
//!
//! Speaks the Anthropic Messages API on the front (`POST /v1/messages`,
//! buffered and streaming) and an OpenAI chat-completions endpoint on the
//! back, with response caching, retry with backoff, and an optional tool
//! execution pass layered in between.
//!
//! ## Usage
//!
//! ```bash
//! # Point at a local Ollama instance (the default)
//! llm-bridge
//!
//! # Point at any OpenAI-style endpoint
//! BACKEND_BASE_URL=https://api.example.com/v1 \
//! BACKEND_API_KEY=sk-... BACKEND_API_KEY_REQUIRED=true llm-bridge
//!
//! # Enable caching and tool execution
//! CACHE_ENABLED=true TOOLS_ENABLED=true TOOLS_ROOT=/tmp/sandbox llm-bridge
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bridge_backends::{OpenAiBackend, OpenAiBackendConfig};
use bridge_config::BridgeConfig;
use bridge_resilience::{
    CosineSimilarityIndex, MemoryCacheStore, ResponseCache, ResponseCacheConfig, RetryPolicy,
};
use bridge_server::AppState;
use bridge_telemetry::{init_logging, LoggingConfig};
use bridge_tools::{ToolEngine, ToolExecutor};
use tracing::{error, info};

/// Application entry point
#[tokio::main]
async fn main() {
    // Initialize logging first
    if let Err(e) = init_logging(&LoggingConfig::default()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting LLM Bridge");

    if let Err(e) = run().await {
        error!(error = %e, "Application failed");
        std::process::exit(1);
    }
}

/// Main application logic
async fn run() -> anyhow::Result<()> {
    let config = BridgeConfig::from_env().context("failed to load configuration")?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        backend = %config.backend.base_url,
        model = %config.backend.model,
        "Configuration loaded"
    );

    let backend = build_backend(&config)?;
    let cache = build_cache(&config);
    let tools = build_tools(&config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid bind address")?;

    let mut builder = AppState::builder()
        .config(config)
        .backend(backend)
        .retry(RetryPolicy::with_defaults());
    if let Some(cache) = cache {
        builder = builder.cache(cache);
    }
    if let Some(tools) = tools {
        builder = builder.tools(tools);
    }
    let state = builder.build().context("failed to build application state")?;

    bridge_server::serve(state, addr)
        .await
        .context("server failed")?;

    Ok(())
}

fn build_backend(config: &BridgeConfig) -> anyhow::Result<Arc<OpenAiBackend>> {
    let mut backend_config = OpenAiBackendConfig::new(config.backend.base_url.clone())
        .with_timeout(Duration::from_secs(config.backend.timeout_secs));

    if let Some(key) = config.backend.api_key.clone() {
        backend_config = backend_config.with_api_key(key);
    }

    let backend = OpenAiBackend::new(backend_config).context("failed to build backend client")?;
    Ok(Arc::new(backend))
}

fn build_cache(config: &BridgeConfig) -> Option<Arc<ResponseCache>> {
    if !config.cache.enabled {
        return None;
    }

    let cache_config = ResponseCacheConfig {
        ttl: Duration::from_secs(config.cache.ttl_secs),
        semantic: config.cache.semantic,
        similarity_threshold: config.cache.similarity_threshold,
    };

    let mut cache = ResponseCache::new(Arc::new(MemoryCacheStore::default()), cache_config);
    if config.cache.semantic {
        cache = cache.with_similarity_index(Arc::new(CosineSimilarityIndex::default()));
    }

    info!(
        semantic = config.cache.semantic,
        ttl_secs = config.cache.ttl_secs,
        "Response cache enabled"
    );
    Some(Arc::new(cache))
}

fn build_tools(config: &BridgeConfig) -> Option<Arc<ToolEngine>> {
    if !config.tools.enabled {
        return None;
    }

    info!(root = %config.tools.root.display(), "Tool execution enabled");
    Some(Arc::new(ToolEngine::new(ToolExecutor::new(
        config.tools.root.clone(),
    ))))
}
