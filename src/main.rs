//! Campus API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──TLS──▶ net::tls ──▶ http::server (trace, request id, timeout, body limit)
//!                                     │
//!                                     ▼
//!                          pipeline (outermost first)
//!        cors → rate_limit → response_time → auth → injection_guard
//!             → hpp → compression → security_headers
//!                                     │
//!                                     ▼
//!                              http::routes ──▶ auth::service ──▶ auth::store
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use campus_gateway::auth::{password::hash_password, InMemoryCredentialStore, LogNotifier, Role};
use campus_gateway::config::{loader, ConfigError, GatewayConfig};
use campus_gateway::lifecycle::{signals, Shutdown};
use campus_gateway::net::tls;
use campus_gateway::observability::{logging, metrics};
use campus_gateway::HttpServer;

/// Seeds a development admin account when set.
const SEED_ADMIN_PASSWORD_ENV: &str = "CAMPUS_SEED_ADMIN_PASSWORD";

#[derive(Parser)]
#[command(name = "campus-gateway")]
#[command(about = "Secure request pipeline and authentication for the campus API", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

fn load(cli: &Cli) -> Result<GatewayConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => loader::load_config(path)?,
        None => loader::load_config_str("", std::env::var(loader::JWT_SECRET_ENV).ok())?,
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind.to_string();
    }
    Ok(config)
}

fn seeded_store() -> Result<InMemoryCredentialStore, Box<dyn std::error::Error>> {
    let store = InMemoryCredentialStore::new();
    if let Ok(password) = std::env::var(SEED_ADMIN_PASSWORD_ENV) {
        let id = store.add_account("admin", "admin@localhost", hash_password(&password)?, Role::Admin);
        tracing::warn!(account = id, "Seeded development admin account");
    }
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "campus-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        rate_limit = config.rate_limit.enabled,
        request_timeout_secs = config.listener.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_handler(shutdown.clone());

    let addr: SocketAddr = config.listener.bind_address.parse()?;
    let rustls_config = match &config.listener.tls {
        Some(paths) => Some(tls::load_tls_config(paths.cert_path.as_ref(), paths.key_path.as_ref())?),
        None => None,
    };

    let server = HttpServer::new(config, Arc::new(seeded_store()?), Arc::new(LogNotifier));
    match rustls_config {
        Some(rustls_config) => server.run_tls(addr, rustls_config, shutdown.subscribe()).await?,
        None => {
            let listener = TcpListener::bind(addr).await?;
            server.run(listener, shutdown.subscribe()).await?
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
