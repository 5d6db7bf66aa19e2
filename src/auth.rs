//! API key access control
//!
//! Requests to gated routes must carry `X-API-Key` equal to the configured
//! key. The check runs before the handler, so a rejected request never
//! touches the filesystem.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::AuthConfig;

/// Header carrying the client credential
pub const API_KEY_HEADER: &str = "x-api-key";

/// Compares supplied credentials against the configured key
#[derive(Debug, Clone)]
pub struct ApiKeyGate {
    enabled: bool,
    expected: Option<String>,
}

impl ApiKeyGate {
    /// A gate that checks against `expected`. `None` rejects everyone.
    pub fn new(expected: Option<String>) -> Self {
        Self {
            enabled: true,
            expected,
        }
    }

    /// A gate that lets every request through
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            expected: None,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        if config.enabled {
            Self::new(config.api_key.clone())
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Exact match; missing or empty credentials never match
    pub fn authorize(&self, supplied: Option<&str>) -> bool {
        if !self.enabled {
            return true;
        }
        match (supplied, self.expected.as_deref()) {
            (Some(supplied), Some(expected)) => !supplied.is_empty() && supplied == expected,
            _ => false,
        }
    }

    fn authorize_headers(&self, headers: &HeaderMap) -> bool {
        let supplied = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        self.authorize(supplied)
    }
}

/// Rejection for a missing or wrong API key
#[derive(Debug, thiserror::Error)]
#[error("Invalid or missing API Key")]
pub struct Unauthorized;

#[derive(Serialize)]
struct UnauthorizedResponse {
    detail: String,
}

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        let body = Json(UnauthorizedResponse {
            detail: self.to_string(),
        });
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Middleware enforcing the gate
pub async fn require_api_key(
    State(gate): State<ApiKeyGate>,
    request: Request,
    next: Next,
) -> Result<Response, Unauthorized> {
    if !gate.authorize_headers(request.headers()) {
        tracing::warn!(
            path = %request.uri().path(),
            has_key = request.headers().contains_key(API_KEY_HEADER),
            "Rejected request without a valid API key"
        );
        return Err(Unauthorized);
    }

    Ok(next.run(request).await)
}
