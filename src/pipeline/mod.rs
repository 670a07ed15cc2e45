//! Request pipeline composition.
//!
//! # Data Flow
//! ```text
//! PipelineBuilder::new()
//!     .stage(a)                      outermost
//!     .stage_excluding(b, paths)     skipped on exact path match
//!     .stage(c)                      innermost
//!     .build(router)
//!
//! request → a → b → c → router → c → b → a → response
//! ```
//!
//! # Design Decisions
//! - Every stage implements one trait, `Middleware`; order is explicit
//! - Composition cannot fail
//! - A stage that rejects writes the response itself and never calls `next`

pub mod builder;
pub mod exclusion;

pub use builder::{Middleware, PipelineBuilder};
pub use exclusion::PathExclusion;
