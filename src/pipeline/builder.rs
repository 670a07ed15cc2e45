//! Ordered composition of middleware stages around a router.
//!
//! A [`Middleware`] sees the request, may reject it by returning a response,
//! and otherwise forwards it with `next.run(request)`. [`PipelineBuilder`]
//! wraps the terminal router so the first stage listed is the outermost one.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};

use crate::pipeline::exclusion::PathExclusion;

/// One stage of the request pipeline.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Stable stage name for logs.
    fn name(&self) -> &'static str;

    /// Handle the request, either answering it or forwarding to `next`.
    async fn handle(&self, request: Request<Body>, next: Next) -> Response;
}

/// Builds the composed request handler.
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Middleware>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage. Earlier stages run before later ones.
    pub fn stage<M: Middleware>(mut self, stage: M) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Append a stage that is skipped for requests whose path exactly
    /// equals one of `paths`.
    pub fn stage_excluding<M, I, P>(self, stage: M, paths: I) -> Self
    where
        M: Middleware,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.stage(PathExclusion::new(stage, paths))
    }

    /// Append a stage only when `enabled`.
    pub fn stage_if<M: Middleware>(self, enabled: bool, stage: M) -> Self {
        if enabled {
            self.stage(stage)
        } else {
            self
        }
    }

    /// Stage names, outermost first.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Wrap `router` with every stage.
    pub fn build(self, router: Router) -> Router {
        tracing::debug!(stages = ?self.stage_names(), "Composing request pipeline");

        // Router::layer makes the most recent layer the outermost, so the
        // stages are applied innermost first.
        self.stages.into_iter().rev().fold(router, |router, stage| {
            router.layer(middleware::from_fn_with_state(stage, dispatch))
        })
    }
}

async fn dispatch(
    State(stage): State<Arc<dyn Middleware>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    stage.handle(request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse, routing::get};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Records its name on the way in, then forwards.
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Middleware for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle(&self, request: Request<Body>, next: Next) -> Response {
            self.log.lock().unwrap().push(self.name);
            next.run(request).await
        }
    }

    struct Reject;

    #[async_trait]
    impl Middleware for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        async fn handle(&self, _request: Request<Body>, _next: Next) -> Response {
            StatusCode::FORBIDDEN.into_response()
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Recorder {
        Recorder {
            name,
            log: log.clone(),
        }
    }

    #[tokio::test]
    async fn test_first_stage_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = log.clone();
        let router = Router::new().route(
            "/",
            get(move || {
                let log = handler_log.clone();
                async move {
                    log.lock().unwrap().push("handler");
                    "ok"
                }
            }),
        );

        let builder = PipelineBuilder::new()
            .stage(recorder("a", &log))
            .stage(recorder("b", &log))
            .stage(recorder("c", &log));
        assert_eq!(builder.stage_names(), vec!["a", "b", "c"]);

        let app = builder.build(router);
        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "handler"]);
    }

    #[tokio::test]
    async fn test_rejecting_stage_stops_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let app = PipelineBuilder::new()
            .stage(recorder("outer", &log))
            .stage(Reject)
            .stage(recorder("inner", &log))
            .build(Router::new().route("/", get(|| async { "ok" })));

        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(*log.lock().unwrap(), vec!["outer"]);
    }

    #[tokio::test]
    async fn test_stage_if_disabled_is_skipped() {
        let builder = PipelineBuilder::new().stage_if(false, Reject);
        assert!(builder.stage_names().is_empty());

        let app = builder.build(Router::new().route("/", get(|| async { "ok" })));
        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
