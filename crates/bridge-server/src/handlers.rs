//! HTTP request handlers for the bridge API.

use std::collections::BTreeMap;
use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bridge_backends::StreamTranslator;
use bridge_core::{
    HealthState, MessagesRequest, MessagesResponse, ResponseBlock, StopReason, StreamEvent, Usage,
};
use bridge_resilience::CachedEntry;
use chrono::Utc;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Health response: overall status plus per-component detail
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// Per-component status strings
    pub components: BTreeMap<String, String>,
}

/// Health check endpoint (`GET /` and `GET /health`)
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut components = BTreeMap::new();
    let mut degraded = false;

    let backend_health = state.backend.health_check().await;
    let backend_status = match backend_health.state {
        HealthState::Healthy => "healthy".to_string(),
        HealthState::Unhealthy => {
            degraded = true;
            backend_health
                .detail
                .map_or_else(|| "unhealthy".to_string(), |d| format!("unhealthy: {d}"))
        }
    };
    components.insert(state.backend.name().to_string(), backend_status);

    let cache_status = match &state.cache {
        Some(cache) => match cache.health_check().await {
            Ok(()) => "healthy".to_string(),
            Err(error) => {
                // Cache failures degrade to fail-open; the service itself
                // stays healthy.
                format!("unhealthy: {error}")
            }
        },
        None => "disabled".to_string(),
    };
    components.insert("cache".to_string(), cache_status);

    Json(HealthResponse {
        status: if degraded { "degraded" } else { "healthy" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        components,
    })
}

/// Model list response (`GET /v1/models`)
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// Always `"list"`
    pub object: String,
    /// Advertised models
    pub data: Vec<ModelEntry>,
}

/// One advertised model
#[derive(Debug, Serialize)]
pub struct ModelEntry {
    /// Model identifier
    pub id: String,
    /// Always `"model"`
    pub object: String,
    /// Creation timestamp (now; the backends do not report one)
    pub created: i64,
    /// Owner string
    pub owned_by: String,
    /// Modality
    #[serde(rename = "type")]
    pub kind: String,
}

impl ModelEntry {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model".to_string(),
            created: Utc::now().timestamp(),
            owned_by: "anthropic".to_string(),
            kind: "text".to_string(),
        }
    }
}

/// List models, falling back to the configured display model when the
/// backend listing is unreachable. Never an error to the client.
#[instrument(skip(state))]
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let data = match state.backend.list_models().await {
        Ok(models) => models
            .into_iter()
            .map(|m| ModelEntry::new(m.id))
            .collect(),
        Err(err) => {
            debug!(error = %err, "Model listing failed, returning fallback list");
            vec![ModelEntry::new(state.converter.display_model())]
        }
    };

    Json(ModelsResponse {
        object: "list".to_string(),
        data,
    })
}

/// Messages endpoint (`POST /v1/messages`)
#[instrument(skip(state, request), fields(model = %request.model, stream = request.stream))]
pub async fn create_message(
    State(state): State<AppState>,
    Json(mut request): Json<MessagesRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    if state.tools.is_some() {
        bridge_tools::inject_tool_instructions(&mut request);
    }

    if request.stream {
        handle_streaming(state, request).await
    } else {
        handle_buffered(state, request).await
    }
}

async fn handle_buffered(state: AppState, request: MessagesRequest) -> Result<Response, ApiError> {
    if let Some(cache) = &state.cache {
        if let Some(entry) = cache.get(&request.messages).await {
            info!("Serving response from cache");
            let stop_reason = entry.stop_reason;
            let mut response = MessagesResponse::text(
                state.converter.display_model().to_string(),
                entry.text,
                Usage::new(entry.input_tokens, entry.output_tokens),
            );
            response.stop_reason = Some(stop_reason);
            return Ok(Json(response).into_response());
        }
    }

    let backend_request = state.converter.to_backend_request(&request);

    let result = state
        .retry
        .execute(|| async { state.backend.chat(&backend_request).await })
        .await;

    let backend_response = match result {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "Backend call failed");
            return Err(err.into());
        }
    };

    let mut response = state
        .converter
        .to_client_response(&request.messages, &backend_response);

    if let Some(tools) = &state.tools {
        let augmented = tools.augment(&response.text_content()).await;
        response.content = vec![ResponseBlock::Text { text: augmented }];
    }

    if let Some(cache) = &state.cache {
        cache
            .put(
                &request.messages,
                CachedEntry::new(
                    response.text_content(),
                    response.usage.input_tokens,
                    response.usage.output_tokens,
                    std::time::Duration::from_secs(state.config.cache.ttl_secs),
                )
                .with_stop_reason(response.stop_reason.unwrap_or(StopReason::EndTurn)),
            )
            .await;
    }

    Ok(Json(response).into_response())
}

async fn handle_streaming(state: AppState, request: MessagesRequest) -> Result<Response, ApiError> {
    let backend_request = state.converter.to_backend_request(&request);
    let input_tokens = state.converter.input_tokens(&request.messages);

    let chunk_stream = state
        .retry
        .execute(|| async { state.backend.chat_stream(&backend_request).await })
        .await
        .map_err(|err| {
            error!(error = %err, "Failed to open backend stream");
            ApiError::from(err)
        })?;

    let mut translator =
        StreamTranslator::new(state.converter.display_model().to_string(), input_tokens);

    let sse_stream = async_stream::stream! {
        let mut chunks = chunk_stream;

        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    for event in translator.on_chunk(&chunk) {
                        yield Ok::<_, Infallible>(sse_event(&event));
                    }
                }
                Err(err) => {
                    error!(error = %err, "Backend stream failed mid-response");
                    let payload = json!({
                        "type": "error",
                        "error": { "message": err.to_string() }
                    });
                    yield Ok(Event::default().event("error").data(payload.to_string()));
                    return;
                }
            }
        }

        for event in translator.finish() {
            yield Ok(sse_event(&event));
        }
    };

    Ok(Sse::new(sse_stream)
        .keep_alive(KeepAlive::default())
        .into_response())
}

fn sse_event(event: &StreamEvent) -> Event {
    Event::default()
        .event(event.event_name())
        .data(serde_json::to_string(event).unwrap_or_default())
}
