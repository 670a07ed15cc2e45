//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → tls.rs (rustls handshake, TLS 1.2+), when configured
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Plain TCP only when no TLS section is configured

pub mod tls;
