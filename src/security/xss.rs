//! Injection guard.
//!
//! HTML-escapes query values and string values in JSON and form bodies so
//! markup submitted by a client is stored and echoed as inert text.
//! Parameter names are left to the HPP whitelist.

use std::borrow::Cow;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::http::request::{buffer_body, content_type_is, rebuild_request, with_query};
use crate::pipeline::Middleware;

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Escape every value of an url-encoded string. `None` when nothing changed.
fn sanitize_pairs(input: &[u8]) -> Option<String> {
    let mut changed = false;
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(input) {
        let escaped = escape_html(&value);
        changed |= matches!(escaped, Cow::Owned(_));
        serializer.append_pair(&key, &escaped);
    }
    changed.then(|| serializer.finish())
}

/// Escape every string inside a JSON value. Returns true if any changed.
fn sanitize_json(value: &mut Value) -> bool {
    match value {
        Value::String(s) => match escape_html(s) {
            Cow::Owned(escaped) => {
                *s = escaped;
                true
            }
            Cow::Borrowed(_) => false,
        },
        Value::Array(items) => items.iter_mut().fold(false, |acc, v| sanitize_json(v) | acc),
        Value::Object(map) => map.values_mut().fold(false, |acc, v| sanitize_json(v) | acc),
        _ => false,
    }
}

/// Injection guard stage.
pub struct InjectionGuard {
    max_body_bytes: usize,
}

impl InjectionGuard {
    pub fn new(max_body_bytes: usize) -> Self {
        Self { max_body_bytes }
    }

    async fn sanitize(&self, mut request: Request<Body>) -> Result<Request<Body>, ApiError> {
        if let Some(query) = request.uri().query() {
            if let Some(cleaned) = sanitize_pairs(query.as_bytes()) {
                let uri = with_query(request.uri(), &cleaned)?;
                *request.uri_mut() = uri;
            }
        }

        let is_json = content_type_is(request.headers(), "application/json");
        let is_form = content_type_is(request.headers(), "application/x-www-form-urlencoded");
        if !is_json && !is_form {
            return Ok(request);
        }

        let (parts, body) = buffer_body(request, self.max_body_bytes).await?;
        let body = if body.is_empty() {
            body
        } else if is_json {
            let mut value: Value = serde_json::from_slice(&body)
                .map_err(|_| ApiError::Validation("invalid JSON body".into()))?;
            if sanitize_json(&mut value) {
                Bytes::from(serde_json::to_vec(&value).map_err(ApiError::internal)?)
            } else {
                body
            }
        } else {
            match sanitize_pairs(&body) {
                Some(cleaned) => Bytes::from(cleaned),
                None => body,
            }
        };

        Ok(rebuild_request(parts, body))
    }
}

#[async_trait]
impl Middleware for InjectionGuard {
    fn name(&self) -> &'static str {
        "injection_guard"
    }

    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        match self.sanitize(request).await {
            Ok(request) => next.run(request).await,
            Err(err) => err.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineBuilder;
    use axum::{
        extract::RawQuery,
        http::{header, StatusCode},
        routing::get,
        Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    fn app() -> Router {
        let router = Router::new().route(
            "/echo",
            get(|RawQuery(q): RawQuery| async move { q.unwrap_or_default() })
                .post(|body: String| async move { body }),
        );
        PipelineBuilder::new().stage(InjectionGuard::new(4096)).build(router)
    }

    async fn send(request: Request<Body>) -> (StatusCode, String) {
        let res = app().oneshot(request).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("plain"), "plain");
        assert!(matches!(escape_html("plain"), Cow::Borrowed(_)));
        assert_eq!(
            escape_html("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("a & \"b\""), "a &amp; &quot;b&quot;");
    }

    #[tokio::test]
    async fn test_json_strings_escaped() {
        let payload = json!({ "first_name": "<b>Ada</b>", "age": 36, "tags": ["ok", "<i>"] });
        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();

        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        let echoed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(echoed["first_name"], "&lt;b&gt;Ada&lt;/b&gt;");
        assert_eq!(echoed["age"], 36);
        assert_eq!(echoed["tags"][1], "&lt;i&gt;");
    }

    #[tokio::test]
    async fn test_query_values_escaped() {
        let request = Request::builder()
            .uri("/echo?name=%3Cscript%3E")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        let pairs: Vec<(String, String)> = form_urlencoded::parse(body.as_bytes()).into_owned().collect();
        assert_eq!(pairs, vec![("name".to_string(), "&lt;script&gt;".to_string())]);
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
