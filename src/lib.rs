//! Campus API gateway library.
//!
//! A request pipeline (CORS, rate limiting, parameter pollution and
//! injection guards, token authentication, response augmentation) in front
//! of the school administration API, plus the authentication lifecycle.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod security;

pub use config::schema::GatewayConfig;
pub use error::ApiError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{Middleware, PipelineBuilder};
