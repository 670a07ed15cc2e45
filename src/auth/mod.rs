//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Login:
//!     service.rs → store.rs (credential lookup)
//!                → password.rs (argon2 verify)
//!                → token.rs (sign) → cookie.rs (Set-Cookie)
//!
//! Every other request:
//!     middleware.rs → cookie.rs (read) → token.rs (verify)
//!                   → identity.rs (request extension, extractor)
//!
//! Forgot / reset password:
//!     service.rs → store.rs (reset token) → notifier.rs (deliver link)
//! ```

pub mod cookie;
pub mod identity;
pub mod middleware;
pub mod notifier;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

pub use identity::{AccountId, Identity, Role};
pub use middleware::TokenAuthenticator;
pub use notifier::{LogNotifier, ResetNotifier};
pub use service::{AuthError, AuthService, LoginOutcome};
pub use store::{CredentialRecord, CredentialStore, InMemoryCredentialStore, StoreError};
pub use token::{Claims, TokenError, TokenSigner};
