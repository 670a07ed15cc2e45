//! Response augmentation stages.
//!
//! # Responsibilities
//! - Measure handling time and report it in `X-Response-Time`
//! - Record request count and latency metrics
//! - Compress response bodies the client accepts (gzip, deflate, br)
//!
//! # Design Decisions
//! - Timing covers every stage nested inside it, so its position in the
//!   pipeline decides what is measured
//! - Compression reuses tower-http's layer around the remaining chain

use std::time::Instant;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tower::{Layer, ServiceExt};
use tower_http::compression::CompressionLayer;

use crate::observability::metrics;
use crate::pipeline::Middleware;

pub const X_RESPONSE_TIME: &str = "x-response-time";

/// Adds `X-Response-Time` and records request metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseTime;

#[async_trait]
impl Middleware for ResponseTime {
    fn name(&self) -> &'static str {
        "response_time"
    }

    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let start = Instant::now();

        let mut response = next.run(request).await;

        let elapsed = start.elapsed();
        if let Ok(value) = HeaderValue::from_str(&format!("{:?}", elapsed)) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(X_RESPONSE_TIME), value);
        }

        tracing::debug!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "Request completed"
        );
        metrics::record_request(method.as_str(), response.status().as_u16(), elapsed);

        response
    }
}

/// Compresses response bodies according to `Accept-Encoding`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Compression;

#[async_trait]
impl Middleware for Compression {
    fn name(&self) -> &'static str {
        "compression"
    }

    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        let service = CompressionLayer::new().layer(next);
        match service.oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineBuilder;
    use axum::{
        http::{header, StatusCode},
        routing::get,
        Router,
    };

    fn app() -> Router {
        let router = Router::new()
            .route("/small", get(|| async { "ok" }))
            .route("/large", get(|| async { "teacher ".repeat(512) }));
        PipelineBuilder::new()
            .stage(ResponseTime)
            .stage(Compression)
            .build(router)
    }

    #[tokio::test]
    async fn test_response_time_header_present() {
        let res = app()
            .oneshot(Request::builder().uri("/small").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let value = res.headers()[X_RESPONSE_TIME].to_str().unwrap();
        assert!(value.ends_with('s'), "unexpected duration format: {}", value);
    }

    #[tokio::test]
    async fn test_large_body_gzip_compressed() {
        let res = app()
            .oneshot(
                Request::builder()
                    .uri("/large")
                    .header(header::ACCEPT_ENCODING, "gzip")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_ENCODING], "gzip");

        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(body.len() < 512 * "teacher ".len());
    }

    #[tokio::test]
    async fn test_no_accept_encoding_passes_plain() {
        let res = app()
            .oneshot(Request::builder().uri("/large").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(!res.headers().contains_key(header::CONTENT_ENCODING));
    }
}
