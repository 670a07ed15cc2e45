//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CAMPUS_JWT_SECRET
//!     → loader.rs (parse & deserialize, apply env override)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to HttpServer, which builds every stage from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; allowed origins and the HPP whitelist
//!   never change while the process runs
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, CorsConfig, GatewayConfig, HppConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RateLimitConfig, TlsConfig,
};
