//! Token authenticator stage.
//!
//! Verifies the session cookie and publishes the caller's [`Identity`] in
//! request extensions. Every failure produces the same 401 response.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::cookie::cookie_value;
use super::token::TokenSigner;
use crate::error::ApiError;
use crate::observability::metrics::record_auth_event;
use crate::pipeline::Middleware;

const UNAUTHORIZED: &str = "unauthorized access, please log in";

pub struct TokenAuthenticator {
    signer: Arc<TokenSigner>,
    cookie_name: String,
}

impl TokenAuthenticator {
    pub fn new(signer: Arc<TokenSigner>, cookie_name: impl Into<String>) -> Self {
        Self {
            signer,
            cookie_name: cookie_name.into(),
        }
    }
}

#[async_trait]
impl Middleware for TokenAuthenticator {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn handle(&self, mut request: Request<Body>, next: Next) -> Response {
        let Some(token) = cookie_value(request.headers(), &self.cookie_name) else {
            tracing::debug!(path = %request.uri().path(), "Missing session cookie");
            record_auth_event("authenticate", "missing");
            return ApiError::Unauthenticated(UNAUTHORIZED.into()).into_response();
        };

        match self.signer.verify(&token) {
            Ok(claims) => {
                request.extensions_mut().insert(claims.identity());
                next.run(request).await
            }
            Err(e) => {
                tracing::debug!(path = %request.uri().path(), error = %e, "Session token rejected");
                record_auth_event("authenticate", "rejected");
                ApiError::Unauthenticated(UNAUTHORIZED.into()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::{Identity, Role};
    use crate::pipeline::PipelineBuilder;
    use axum::{
        http::{header, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    fn signer() -> Arc<TokenSigner> {
        Arc::new(TokenSigner::new(
            b"middleware-test-secret-at-least-32-bytes",
            Duration::hours(24),
        ))
    }

    fn app(signer: Arc<TokenSigner>) -> Router {
        let router = Router::new()
            .route("/execs/me", get(|identity: Identity| async move { Json(identity) }))
            .route("/execs/login", post(|| async { "login" }));
        PipelineBuilder::new()
            .stage_excluding(TokenAuthenticator::new(signer, "Bearer"), ["/execs/login"])
            .build(router)
    }

    fn admin() -> Identity {
        Identity {
            subject_id: 1,
            username: "admin".into(),
            role: Role::Admin,
        }
    }

    async fn get_me(app: Router, cookie: Option<String>) -> Response {
        let mut builder = Request::builder().uri("/execs/me");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_publishes_identity() {
        let signer = signer();
        let issued = signer.issue(&admin(), Utc::now()).unwrap();
        let res = get_me(app(signer), Some(format!("Bearer={}", issued.token))).await;

        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let identity: Identity = serde_json::from_slice(&body).unwrap();
        assert_eq!(identity, admin());
    }

    #[tokio::test]
    async fn test_missing_bad_and_expired_tokens_rejected_uniformly() {
        let signer = signer();
        let expired = signer
            .issue(&admin(), Utc::now() - Duration::hours(48))
            .unwrap()
            .token;

        let mut bodies = Vec::new();
        for cookie in [None, Some("Bearer=garbage".to_string()), Some(format!("Bearer={}", expired))] {
            let res = get_me(app(signer.clone()), cookie).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
            bodies.push(axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap());
        }
        assert!(bodies.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_excluded_path_ignores_bad_token() {
        let res = app(signer())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/execs/login")
                    .header(header::COOKIE, "Bearer=garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
