//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wrap it in the security pipeline, in the fixed stage order
//! - Wire up transport layers (tracing, request ID, timeout, body limit)
//! - Serve over plain TCP or TLS with graceful shutdown
//!
//! # Pipeline order (outermost first)
//! ```text
//! cors → rate_limit → response_time → auth (minus excluded paths)
//!      → injection_guard → hpp → compression → security_headers → routes
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::HeaderName, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{AuthService, CredentialStore, ResetNotifier, TokenAuthenticator, TokenSigner};
use crate::config::GatewayConfig;
use crate::http::request::{MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::response::{Compression, ResponseTime};
use crate::http::routes::{self, AppState};
use crate::lifecycle::shutdown;
use crate::pipeline::PipelineBuilder;
use crate::security::{
    cors::Cors,
    headers::SecurityHeaders,
    hpp::Hpp,
    rate_limit::{RateLimit, RateLimiter},
    xss::InjectionGuard,
};

/// Time given to in-flight requests once shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Assemble the pipeline stages in their fixed order.
pub fn build_pipeline(
    config: &GatewayConfig,
    signer: Arc<TokenSigner>,
    limiter: Option<Arc<RateLimiter>>,
) -> PipelineBuilder {
    let max_body = config.listener.max_body_bytes;

    let mut pipeline = PipelineBuilder::new().stage(Cors::from_config(&config.cors));
    if let Some(limiter) = limiter {
        pipeline = pipeline.stage(RateLimit::new(limiter));
    }

    pipeline
        .stage(ResponseTime)
        .stage_excluding(
            TokenAuthenticator::new(signer, config.auth.cookie_name.clone()),
            config.auth.excluded_paths.iter().cloned(),
        )
        .stage(InjectionGuard::new(max_body))
        .stage(Hpp::from_config(&config.hpp, max_body))
        .stage(Compression)
        .stage(SecurityHeaders)
}

/// HTTP server for the campus API.
pub struct HttpServer {
    app: Router,
    config: GatewayConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        let signer = Arc::new(TokenSigner::from_config(&config.auth));
        let auth = Arc::new(AuthService::new(&config.auth, signer.clone(), store, notifier));
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::from_config(&config.rate_limit)));

        let pipeline = build_pipeline(&config, signer, limiter.clone());
        tracing::info!(stages = ?pipeline.stage_names(), "Request pipeline configured");

        let app = Self::build_router(&config, pipeline.build(routes::router(AppState { auth })));
        Self { app, config, limiter }
    }

    /// Transport layers around the pipeline.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, app: Router) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        app.layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuidV4))
    }

    /// The fully layered application, for in-process use.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn start_background_tasks(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.spawn_sweeper(Duration::from_secs(self.config.rate_limit.sweep_interval_secs));
        }
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown_rx: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::warn!(address = %addr, "HTTP server starting without TLS");
        self.start_background_tasks();

        let app = self.app.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");
        self.start_background_tasks();

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            shutdown::wait(shutdown_rx).await;
            drain.graceful_shutdown(Some(DRAIN_TIMEOUT));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.app.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}
