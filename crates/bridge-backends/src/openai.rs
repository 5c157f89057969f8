//! OpenAI-style chat-completions backend client.
//!
//! Works against any endpoint speaking the OpenAI protocol: local model
//! runners with an OpenAI-compatible facade as well as hosted inference
//! clouds. Wire types stay private to this module; the public surface is
//! the [`ChatBackend`] trait.

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use bridge_core::{
    BackendHealth, BackendModel, BridgeError, BridgeResult, ChatBackend, ChatChunk, ChatRequest,
    ChatResponse, ChatUsage, ChunkStream,
};
use futures_util::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error, trace, warn};

/// Remaining-request level below which a warning is logged
const LOW_REQUEST_QUOTA_THRESHOLD: u64 = 10;
/// Remaining-token level below which a warning is logged
const LOW_TOKEN_QUOTA_THRESHOLD: u64 = 10_000;

/// Configuration for the OpenAI-style backend
#[derive(Debug, Clone)]
pub struct OpenAiBackendConfig {
    /// Base URL including any `/v1` suffix (e.g. `https://api.cerebras.ai/v1`)
    pub base_url: String,
    /// Bearer token, when the endpoint requires one
    pub api_key: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl OpenAiBackendConfig {
    /// Create a config for an endpoint without authentication
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`ChatBackend`] over the OpenAI chat-completions protocol
pub struct OpenAiBackend {
    config: OpenAiBackendConfig,
    client: Client,
}

impl OpenAiBackend {
    /// Create a backend client.
    ///
    /// # Errors
    /// Returns a config error when the HTTP client cannot be built.
    pub fn new(config: OpenAiBackendConfig) -> BridgeResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BridgeError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.config.base_url.trim_end_matches('/'))
    }

    fn request_builder(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url).header("Content-Type", "application/json");
        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }
        builder
    }

    fn map_transport_error(&self, error: &reqwest::Error) -> BridgeError {
        if error.is_timeout() {
            BridgeError::timeout(self.config.timeout.as_secs())
        } else {
            BridgeError::connection(error.to_string())
        }
    }

    /// Warn when the backend reports it is close to a rate limit.
    fn check_quota_headers(headers: &reqwest::header::HeaderMap) {
        for (header, threshold) in [
            ("x-ratelimit-remaining-requests", LOW_REQUEST_QUOTA_THRESHOLD),
            ("x-ratelimit-remaining-tokens", LOW_TOKEN_QUOTA_THRESHOLD),
        ] {
            if let Some(remaining) = headers
                .get(header)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
            {
                if remaining < threshold {
                    warn!(header = header, remaining = remaining, "Backend quota low");
                }
            }
        }
    }

    /// Server-suggested retry delay in milliseconds, from either a
    /// `retry-after-ms` header or a seconds-valued `retry-after` header.
    fn retry_hint_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
        if let Some(ms) = headers
            .get("retry-after-ms")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok())
        {
            return Some(ms.max(0.0) as u64);
        }

        headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok())
            .map(|secs| (secs.max(0.0) * 1000.0) as u64)
    }

    async fn error_from_response(response: reqwest::Response) -> BridgeError {
        let status = response.status().as_u16();
        let retry_hint = Self::retry_hint_ms(response.headers());
        let body = response.text().await.unwrap_or_default();

        let detail = serde_json::from_str::<WireErrorResponse>(&body)
            .map_or(body.clone(), |e| e.error.message);

        if status == 429 {
            return BridgeError::rate_limited(detail, retry_hint);
        }

        BridgeError::backend(status, detail)
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn chat(&self, request: &ChatRequest) -> BridgeResult<ChatResponse> {
        let url = self.completions_url();
        debug!(url = %url, model = %request.model, "Sending chat completion");

        let response = self
            .request_builder(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        Self::check_quota_headers(response.headers());

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let completion: WireCompletion = response
            .json()
            .await
            .map_err(|e| BridgeError::backend(502, format!("unparseable response: {e}")))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::backend(502, "response contained no choices"))?;

        Ok(ChatResponse {
            text: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason,
            usage: completion.usage.map(|u| ChatUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> BridgeResult<ChunkStream> {
        let url = self.completions_url();
        let mut streamed = request.clone();
        streamed.stream = true;

        debug!(url = %url, model = %streamed.model, "Starting streaming chat completion");

        let builder = self.request_builder(&url).json(&streamed);
        let event_source = EventSource::new(builder)
            .map_err(|e| BridgeError::connection(format!("failed to open event source: {e}")))?;

        let stream = try_stream! {
            let mut es = event_source;

            while let Some(event) = es.next().await {
                match event {
                    Ok(Event::Open) => {
                        trace!("Backend stream opened");
                    }
                    Ok(Event::Message(msg)) => {
                        let data = msg.data.trim();

                        if data == "[DONE]" {
                            break;
                        }

                        match serde_json::from_str::<WireChunk>(data) {
                            Ok(chunk) => {
                                if let Some(choice) = chunk.choices.into_iter().next() {
                                    yield ChatChunk {
                                        delta: choice.delta.content.unwrap_or_default(),
                                        finish_reason: choice.finish_reason,
                                    };
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, data = %data, "Skipping unparseable chunk");
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Backend stream error");
                        Err(BridgeError::stream(e.to_string()))?;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn list_models(&self) -> BridgeResult<Vec<BackendModel>> {
        let url = self.models_url();
        let mut builder = self.client.get(&url);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let response = builder
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let listing: WireModelList = response
            .json()
            .await
            .map_err(|e| BridgeError::backend(502, format!("unparseable model list: {e}")))?;

        Ok(listing
            .data
            .into_iter()
            .map(|m| BackendModel { id: m.id })
            .collect())
    }

    async fn health_check(&self) -> BackendHealth {
        match self.list_models().await {
            Ok(_) => BackendHealth::healthy(),
            Err(error) => {
                warn!(error = %error, "Backend health check failed");
                BackendHealth::unhealthy(error.to_string())
            }
        }
    }
}

// ============================================================================
// Wire types (OpenAI chat-completions protocol)
// ============================================================================

#[derive(Debug, Deserialize)]
struct WireCompletion {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    choices: Vec<WireChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChunkChoice {
    delta: WireDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireModelList {
    data: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: WireErrorBody,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::{ChatMessage, Role};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_request() -> ChatRequest {
        ChatRequest {
            model: "llama3.1-8b".to_string(),
            messages: vec![ChatMessage::new(Role::User, "hi")],
            max_tokens: Some(32),
            temperature: None,
            stream: false,
        }
    }

    async fn backend_for(server: &MockServer) -> OpenAiBackend {
        OpenAiBackend::new(OpenAiBackendConfig::new(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_chat_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "hello"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 4, "completion_tokens": 1, "total_tokens": 5}
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let response = backend.chat(&chat_request()).await.unwrap();

        assert_eq!(response.text, "hello");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.unwrap().prompt_tokens, 4);
    }

    #[tokio::test]
    async fn test_429_maps_to_rate_limited_with_hint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after-ms", "250")
                    .set_body_json(serde_json::json!({
                        "error": {"message": "rate limit exceeded"}
                    })),
            )
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let err = backend.chat(&chat_request()).await.unwrap_err();

        assert!(matches!(err, BridgeError::RateLimited { .. }));
        assert_eq!(err.retry_after_ms(), Some(250));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_retry_after_seconds_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "2")
                    .set_body_string("slow down"),
            )
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let err = backend.chat(&chat_request()).await.unwrap_err();
        assert_eq!(err.retry_after_ms(), Some(2000));
    }

    #[tokio::test]
    async fn test_client_error_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "bad request"}
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let err = backend.chat(&chat_request()).await.unwrap_err();

        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("bad request"));
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [{"id": "llama3.1-8b", "object": "model"}]
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let models = backend.list_models().await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "llama3.1-8b");
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let backend =
            OpenAiBackend::new(OpenAiBackendConfig::new("http://127.0.0.1:1")).unwrap();
        let health = backend.health_check().await;
        assert_eq!(health.state, bridge_core::HealthState::Unhealthy);
    }
}
