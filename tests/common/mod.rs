//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
};
use serde_json::Value;
use tokio::net::TcpListener;

use campus_gateway::auth::{
    notifier::NotifyError, password::hash_password, AccountId, CredentialRecord, CredentialStore,
    InMemoryCredentialStore, ResetNotifier, Role,
};
use campus_gateway::{GatewayConfig, HttpServer, Shutdown};

pub const ORIGIN: &str = "https://localhost:8000";
pub const ADMIN_PASSWORD: &str = "admin-password-1";
pub const EXEC_PASSWORD: &str = "exec-password-1";
pub const EXEC_EMAIL: &str = "jdoe@school.example";

/// Captures reset links instead of delivering them.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(AccountId, String)>>,
}

impl RecordingNotifier {
    pub fn last_token(&self) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .last()
            .and_then(|(_, url)| url.rsplit('/').next())
            .map(str::to_string)
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ResetNotifier for RecordingNotifier {
    async fn send_reset_link(
        &self,
        account: &CredentialRecord,
        reset_url: &str,
        _valid_for: chrono::Duration,
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((account.id, reset_url.to_string()));
        Ok(())
    }
}

/// Configuration valid for tests: real secret, plain cookies, generous
/// rate limit.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.auth.jwt_secret = "integration-test-secret-at-least-32-bytes".into();
    config.auth.cookie_secure = false;
    config.rate_limit.max_requests = 1_000;
    config
}

pub struct TestApp {
    pub server: HttpServer,
    pub store: Arc<InMemoryCredentialStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub admin_id: AccountId,
    pub exec_id: AccountId,
}

pub fn seeded_store() -> (Arc<InMemoryCredentialStore>, AccountId, AccountId) {
    let store = Arc::new(InMemoryCredentialStore::new());
    let admin_id = store.add_account(
        "admin",
        "admin@school.example",
        hash_password(ADMIN_PASSWORD).unwrap(),
        Role::Admin,
    );
    let exec_id = store.add_account("jdoe", EXEC_EMAIL, hash_password(EXEC_PASSWORD).unwrap(), Role::Exec);
    (store, admin_id, exec_id)
}

pub fn build(config: GatewayConfig) -> TestApp {
    let (store, admin_id, exec_id) = seeded_store();
    let notifier = Arc::new(RecordingNotifier::default());
    let server = HttpServer::new(config, store.clone(), notifier.clone());
    TestApp {
        server,
        store,
        notifier,
        admin_id,
        exec_id,
    }
}

/// Build with a custom store.
pub fn build_with_store(config: GatewayConfig, store: Arc<dyn CredentialStore>) -> HttpServer {
    HttpServer::new(config, store, Arc::new(RecordingNotifier::default()))
}

/// Serve `server` on an ephemeral port. Trigger the returned `Shutdown` to
/// stop it.
pub async fn spawn_server(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, shutdown)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Request from the allowed origin, optionally with a JSON body and a
/// session cookie.
pub fn request(method: &str, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ORIGIN, ORIGIN);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("Bearer={}", token));
    }
    match body {
        Some(body) => {
            let body = body.to_string();
            builder
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_LENGTH, body.len())
                .body(Body::from(body))
                .unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
