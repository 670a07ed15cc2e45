//! Cross-origin policy.
//!
//! # Responsibilities
//! - Reject requests whose `Origin` is not on the allow-list (403)
//! - Echo an allowed origin and attach the static CORS headers
//! - Answer preflight (`OPTIONS`) requests without running later stages
//!
//! # Design Decisions
//! - Exact string comparison of origins, no wildcard
//! - A missing or empty `Origin` is treated as disallowed unless
//!   `allow_missing_origin` is configured

use std::collections::HashSet;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::CorsConfig;
use crate::error::ApiError;
use crate::pipeline::Middleware;

/// Origin allow-list and the headers sent with every allowed response.
pub struct Cors {
    allowed_origins: HashSet<String>,
    allow_missing_origin: bool,
    static_headers: HeaderMap,
}

impl Cors {
    pub fn from_config(config: &CorsConfig) -> Self {
        let mut static_headers = HeaderMap::new();
        let mut set = |name: header::HeaderName, value: String| {
            match HeaderValue::from_str(&value) {
                Ok(v) => {
                    static_headers.insert(name, v);
                }
                Err(_) => tracing::warn!(header = %name, value = %value, "Skipping invalid CORS header value"),
            }
        };

        set(header::ACCESS_CONTROL_ALLOW_HEADERS, config.allowed_headers.join(", "));
        set(header::ACCESS_CONTROL_ALLOW_METHODS, config.allowed_methods.join(", "));
        set(header::ACCESS_CONTROL_EXPOSE_HEADERS, config.exposed_headers.join(", "));
        set(header::ACCESS_CONTROL_MAX_AGE, config.max_age_secs.to_string());
        if config.allow_credentials {
            set(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true".to_string());
        }

        Self {
            allowed_origins: config.allowed_origins.iter().cloned().collect(),
            allow_missing_origin: config.allow_missing_origin,
            static_headers,
        }
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.contains(origin)
    }

    fn annotate(&self, headers: &mut HeaderMap, origin: HeaderValue) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
        for (name, value) in &self.static_headers {
            headers.insert(name.clone(), value.clone());
        }
    }
}

#[async_trait]
impl Middleware for Cors {
    fn name(&self) -> &'static str {
        "cors"
    }

    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        let origin = request
            .headers()
            .get(header::ORIGIN)
            .filter(|v| !v.is_empty())
            .cloned();

        let origin = match origin {
            Some(origin) if origin.to_str().map(|o| self.is_origin_allowed(o)).unwrap_or(false) => origin,
            None if self.allow_missing_origin => return next.run(request).await,
            other => {
                tracing::warn!(
                    origin = ?other,
                    path = %request.uri().path(),
                    "Origin not allowed by CORS"
                );
                return ApiError::Forbidden("not allowed by CORS".into()).into_response();
            }
        };

        if request.method() == Method::OPTIONS {
            let mut response = StatusCode::NO_CONTENT.into_response();
            self.annotate(response.headers_mut(), origin);
            return response;
        }

        let mut response = next.run(request).await;
        self.annotate(response.headers_mut(), origin);
        response
    }
}
