//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (transport layers, request ID, timeout, body limit)
//!     → pipeline stages (security, auth, response.rs augmenters)
//!     → routes.rs (handlers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod routes;
pub mod server;

pub use request::X_REQUEST_ID;
pub use routes::AppState;
pub use server::HttpServer;
