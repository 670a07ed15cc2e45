//! Exact-path bypass for a single stage.
//!
//! # Design Decisions
//! - Matching is byte-for-byte equality on the URI path, no prefixes or
//!   patterns: `/execs/login` does not exclude `/execs/login/` or
//!   `/execs/loginx`
//! - The query string is not part of the path

use std::collections::HashSet;

use async_trait::async_trait;
use axum::{body::Body, http::Request, middleware::Next, response::Response};

use crate::pipeline::builder::Middleware;

/// Runs `inner` unless the request path is in the exclusion set.
pub struct PathExclusion<M> {
    inner: M,
    paths: HashSet<String>,
}

impl<M: Middleware> PathExclusion<M> {
    pub fn new<I, P>(inner: M, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            inner,
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// True if `path` bypasses the wrapped stage.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.paths.contains(path)
    }
}

#[async_trait]
impl<M: Middleware> Middleware for PathExclusion<M> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        if self.is_excluded(request.uri().path()) {
            tracing::trace!(
                stage = self.inner.name(),
                path = %request.uri().path(),
                "Stage bypassed for excluded path"
            );
            return next.run(request).await;
        }
        self.inner.handle(request, next).await
    }
}
