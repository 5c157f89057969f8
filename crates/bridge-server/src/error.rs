//! API error mapping.
//!
//! Every client-visible failure is JSON of the form `{"detail": message}`
//! with an appropriate status code. Transport-level panics or raw error
//! strings never reach the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bridge_core::BridgeError;
use serde_json::json;

/// An error ready to be returned to the client
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// Create an error with an explicit status
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// A 400 Bad Request error
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    /// Status code of this error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Detail message of this error
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<BridgeError> for ApiError {
    fn from(error: BridgeError) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            detail: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let api: ApiError = BridgeError::validation("messages cannot be empty", None).into();
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert!(api.detail().contains("messages cannot be empty"));
    }

    #[test]
    fn test_rate_limit_maps_to_429() {
        let api: ApiError = BridgeError::rate_limited("limited", None).into();
        assert_eq!(api.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_upstream_5xx_maps_to_502() {
        let api: ApiError = BridgeError::backend(503, "unavailable").into();
        assert_eq!(api.status(), StatusCode::BAD_GATEWAY);
    }
}
