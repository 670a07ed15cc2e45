//! HTTP parameter pollution guard.
//!
//! # Responsibilities
//! - Reject query parameters and body fields outside the whitelist (400)
//! - Collapse repeated parameters to their first value
//! - Run before any handler observes the body
//!
//! # Design Decisions
//! - The body is inspected only when its content type equals the
//!   configured one; other bodies pass through untouched
//! - Form bodies are de-duplicated and re-encoded; JSON bodies are checked
//!   on their top-level keys (objects, or arrays of objects)

use std::collections::HashSet;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use url::form_urlencoded;

use crate::config::HppConfig;
use crate::error::ApiError;
use crate::http::request::{buffer_body, content_type_is, rebuild_request, with_query};
use crate::pipeline::Middleware;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Check every top-level field name of a JSON payload against `allowed`.
///
/// Accepts a single object or an array of objects. Scalars carry no field
/// names and pass.
pub fn ensure_allowed_fields<F>(value: &Value, allowed: F) -> Result<(), ApiError>
where
    F: Fn(&str) -> bool,
{
    let check = |object: &serde_json::Map<String, Value>| {
        match object.keys().find(|key| !allowed(key.as_str())) {
            Some(key) => Err(ApiError::Validation(format!(
                "unacceptable field '{}' found in request, only use allowed fields",
                key
            ))),
            None => Ok(()),
        }
    };

    match value {
        Value::Object(object) => check(object),
        Value::Array(items) => items.iter().try_for_each(|item| match item {
            Value::Object(object) => check(object),
            _ => Ok(()),
        }),
        _ => Ok(()),
    }
}

/// Parameter pollution guard stage.
pub struct Hpp {
    check_query: bool,
    check_body: bool,
    body_content_type: String,
    whitelist: HashSet<String>,
    max_body_bytes: usize,
}

impl Hpp {
    pub fn from_config(config: &HppConfig, max_body_bytes: usize) -> Self {
        Self {
            check_query: config.check_query,
            check_body: config.check_body,
            body_content_type: config.body_content_type.trim().to_ascii_lowercase(),
            whitelist: config.whitelist.iter().cloned().collect(),
            max_body_bytes,
        }
    }

    fn is_allowed(&self, name: &str) -> bool {
        self.whitelist.contains(name)
    }

    /// Check url-encoded pairs and collapse duplicates.
    ///
    /// Returns the re-encoded string only when something was collapsed.
    fn clean_pairs(&self, input: &[u8], what: &str) -> Result<Option<String>, ApiError> {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        let mut collapsed = false;

        for (key, value) in form_urlencoded::parse(input) {
            if !self.is_allowed(&key) {
                tracing::debug!(parameter = %key, source = what, "Rejected non-whitelisted parameter");
                return Err(ApiError::Validation(format!("{} parameter '{}' is not allowed", what, key)));
            }
            if seen.insert(key.clone()) {
                kept.push((key, value));
            } else {
                collapsed = true;
            }
        }

        if !collapsed {
            return Ok(None);
        }

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &kept {
            serializer.append_pair(key, value);
        }
        Ok(Some(serializer.finish()))
    }

    fn clean_body(&self, content_json: bool, body: Bytes) -> Result<Bytes, ApiError> {
        if content_json {
            if body.is_empty() {
                return Ok(body);
            }
            let value: Value = serde_json::from_slice(&body)
                .map_err(|_| ApiError::Validation("invalid JSON body".into()))?;
            ensure_allowed_fields(&value, |field| self.is_allowed(field))?;
            return Ok(body);
        }

        match self.clean_pairs(&body, "body")? {
            Some(cleaned) => Ok(Bytes::from(cleaned)),
            None => Ok(body),
        }
    }

    async fn guard(&self, mut request: Request<Body>) -> Result<Request<Body>, ApiError> {
        if self.check_query {
            if let Some(query) = request.uri().query() {
                if let Some(cleaned) = self.clean_pairs(query.as_bytes(), "query")? {
                    let uri = with_query(request.uri(), &cleaned)?;
                    *request.uri_mut() = uri;
                }
            }
        }

        if self.check_body && content_type_is(request.headers(), &self.body_content_type) {
            let content_json = self.body_content_type == JSON_CONTENT_TYPE;
            if !content_json && self.body_content_type != FORM_CONTENT_TYPE {
                tracing::warn!(
                    content_type = %self.body_content_type,
                    "Body check configured for a content type without a field parser"
                );
                return Ok(request);
            }

            let (parts, body) = buffer_body(request, self.max_body_bytes).await?;
            let body = self.clean_body(content_json, body)?;
            request = rebuild_request(parts, body);
        }

        Ok(request)
    }
}

#[async_trait]
impl Middleware for Hpp {
    fn name(&self) -> &'static str {
        "hpp"
    }

    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        match self.guard(request).await {
            Ok(request) => next.run(request).await,
            Err(err) => err.into_response(),
        }
    }
}
