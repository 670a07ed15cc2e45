//! Request-level error taxonomy.
//!
//! Every stage of the pipeline and every handler reports failure as an
//! [`ApiError`]. The first stage that fails writes the one and only response
//! for the request; nothing downstream runs afterwards.
//!
//! # Status mapping
//! ```text
//! Validation       → 400  malformed input, whitelist violation
//! Unauthenticated  → 401  missing/invalid/expired token, bad credentials
//! Forbidden        → 403  disallowed origin, inactive account, role
//! RateLimited      → 429  + Retry-After
//! Internal         → 500  body read failure, persistence failure
//! ```

use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed input or a parameter outside the whitelist.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credentials.
    #[error("{0}")]
    Unauthenticated(String),

    /// Caller is known but not allowed (origin, inactive account, role).
    #[error("{0}")]
    Forbidden(String),

    /// Client exhausted its request window.
    #[error("too many requests, please try again later")]
    RateLimited { retry_after: Duration },

    /// Unexpected failure. The detail is logged, never returned.
    #[error("internal server error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: &'static str,
    message: &'a str,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        ApiError::Internal(detail.to_string())
    }
}

/// Whole seconds for a `Retry-After` header, rounded up so clients never
/// come back early.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Request failed with internal error");
        }

        let message = self.to_string();
        let mut response = (
            status,
            Json(ErrorBody {
                status: "error",
                message: &message,
            }),
        )
            .into_response();

        if let ApiError::RateLimited { retry_after } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(retry_after)),
            );
        }

        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(format!("invalid request body: {}", rejection.body_text()))
    }
}
