//! Request handling helpers shared by the pipeline stages.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Buffer a request body once so a stage can inspect and rewrite it
//! - Content type and query string plumbing

use axum::{
    body::{Body, Bytes},
    http::{header, request::Parts, uri::PathAndQuery, HeaderMap, HeaderValue, Request, Uri},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::ApiError;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// True when the essence of the request's content type equals `expected`,
/// ignoring case and parameters such as `charset`.
pub fn content_type_is(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

/// Read the whole body, up to `limit` bytes.
pub async fn buffer_body(request: Request<Body>, limit: usize) -> Result<(Parts, Bytes), ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| ApiError::internal(format!("failed to read request body: {}", e)))?;
    Ok((parts, bytes))
}

/// Put a (possibly rewritten) body back and fix up `Content-Length`.
pub fn rebuild_request(mut parts: Parts, body: Bytes) -> Request<Body> {
    parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    Request::from_parts(parts, Body::from(body))
}

/// Replace the query string of `uri`, keeping scheme, authority and path.
pub fn with_query(uri: &Uri, query: &str) -> Result<Uri, ApiError> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|_| ApiError::Validation("malformed query string".into()))?,
    );
    Uri::from_parts(parts).map_err(|_| ApiError::Validation("malformed request URI".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_essence() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("Application/JSON; charset=utf-8"),
        );
        assert!(content_type_is(&headers, "application/json"));
        assert!(!content_type_is(&headers, "application/x-www-form-urlencoded"));
        assert!(!content_type_is(&HeaderMap::new(), "application/json"));
    }

    #[test]
    fn test_with_query_keeps_path() {
        let uri: Uri = "/teachers?name=a&name=b".parse().unwrap();
        assert_eq!(with_query(&uri, "name=a").unwrap(), "/teachers?name=a");
        assert_eq!(with_query(&uri, "").unwrap(), "/teachers");
    }

    #[tokio::test]
    async fn test_buffer_body_over_limit_is_internal_error() {
        let request = Request::builder()
            .body(Body::from(vec![b'a'; 32]))
            .unwrap();
        let err = buffer_body(request, 8).await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
