//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS, transport limits).
    pub listener: ListenerConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Parameter pollution guard.
    pub hpp: HppConfig,

    /// Token, cookie and password settings.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Optional TLS configuration. Plain HTTP is served when absent.
    pub tls: Option<TlsConfig>,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            tls: None,
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Cross-origin resource sharing policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins allowed to call the API.
    pub allowed_origins: Vec<String>,

    pub allowed_headers: Vec<String>,

    pub allowed_methods: Vec<String>,

    pub exposed_headers: Vec<String>,

    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,

    /// Let requests without an `Origin` header through (non-browser
    /// callers). Rejected by default.
    pub allow_missing_origin: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "https://my-origin-url.com".to_string(),
                "https://localhost:8000".to_string(),
            ],
            allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            exposed_headers: vec!["Authorization".to_string()],
            allow_credentials: true,
            max_age_secs: 3600,
            allow_missing_origin: false,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client within one window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// How often stale windows are swept, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 5,
            window_secs: 60,
            sweep_interval_secs: 300,
        }
    }
}

/// HTTP parameter pollution guard.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HppConfig {
    pub check_query: bool,

    pub check_body: bool,

    /// Body is only inspected when the request content type equals this.
    pub body_content_type: String,

    /// Parameter and field names that may appear in a request.
    pub whitelist: Vec<String>,
}

impl Default for HppConfig {
    fn default() -> Self {
        Self {
            check_query: true,
            check_body: true,
            body_content_type: "application/x-www-form-urlencoded".to_string(),
            whitelist: ["sortBy", "sortOrder", "name", "age", "class"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }
}

/// Token, cookie and password lifecycle settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens. Overridden by `CAMPUS_JWT_SECRET`.
    pub jwt_secret: String,

    /// Token lifetime in hours.
    pub token_ttl_hours: i64,

    pub cookie_name: String,

    /// Mark the auth cookie `Secure`.
    pub cookie_secure: bool,

    /// Paths served without a token (exact match).
    pub excluded_paths: Vec<String>,

    /// Reset token lifetime in minutes.
    pub reset_token_ttl_minutes: i64,

    /// Base URL the reset token is appended to in the delivered link.
    pub reset_url_base: String,

    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            jwt_secret: "CHANGE_ME_IN_PRODUCTION".to_string(),
            token_ttl_hours: 24,
            cookie_name: "Bearer".to_string(),
            cookie_secure: true,
            excluded_paths: vec![
                "/execs/login".to_string(),
                "/execs/forgotpassword".to_string(),
                "/execs/resetpassword/reset".to_string(),
            ],
            reset_token_ttl_minutes: 10,
            reset_url_base: "https://localhost:3000/execs/resetpassword/reset".to_string(),
            min_password_length: 8,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
