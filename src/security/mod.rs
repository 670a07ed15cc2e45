//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (origin allow-list, preflight)
//!     → rate_limit.rs (per-client fixed window)
//!     → xss.rs (escape markup in query and body values)
//!     → hpp.rs (parameter whitelist, duplicate collapse)
//!     → Pass to routing
//! Outgoing response:
//!     → headers.rs (hardening headers)
//! ```
//!
//! # Design Decisions
//! - Fail closed: the first failing check writes the response
//! - No trust in client input

pub mod cors;
pub mod headers;
pub mod hpp;
pub mod rate_limit;
pub mod xss;
