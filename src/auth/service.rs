//! Authentication lifecycle: login, logout, password update, forgot and
//! reset password.
//!
//! # State machine
//! ```text
//! Anonymous ──login──→ Authenticated ──logout──→ Anonymous
//! Anonymous ──forgot──→ ResetRequested ──reset──→ Anonymous
//! ```
//! Tokens are stateless, so these states live on the client. The service
//! enforces the transitions.
//!
//! # Design Decisions
//! - Unknown username and wrong password produce the same error, and an
//!   unknown username still pays for one password verification
//! - Inactive accounts are reported only after the password verified
//! - Forgot-password answers the same way whether or not the email exists
//! - A reset token is checked before the password policy, and consumed
//!   before the new hash is written
//! - An unknown account id on password update fails like a wrong current
//!   password

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use super::cookie::{auth_cookie, expired_cookie};
use super::identity::{AccountId, Identity};
use super::notifier::ResetNotifier;
use super::password::{
    burn_verification_blocking, hash_password_blocking, verify_password_blocking, PasswordError,
};
use super::store::{CredentialStore, StoreError};
use super::token::{TokenError, TokenSigner};
use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::observability::metrics::record_auth_event;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("invalid or expired reset token")]
    InvalidResetToken,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => ApiError::Validation(msg),
            AuthError::InvalidCredentials | AuthError::InvalidResetToken => {
                ApiError::Unauthenticated(err.to_string())
            }
            AuthError::AccountInactive => ApiError::Forbidden(err.to_string()),
            AuthError::Store(_) | AuthError::Token(_) | AuthError::Password(_) => ApiError::internal(err),
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// `Set-Cookie` value.
    pub cookie: String,
}

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn ResetNotifier>,
    signer: Arc<TokenSigner>,
    cookie_name: String,
    cookie_secure: bool,
    reset_ttl: Duration,
    reset_url_base: String,
    min_password_length: usize,
}

impl AuthService {
    pub fn new(
        config: &AuthConfig,
        signer: Arc<TokenSigner>,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        Self {
            store,
            notifier,
            signer,
            cookie_name: config.cookie_name.clone(),
            cookie_secure: config.cookie_secure,
            reset_ttl: Duration::minutes(config.reset_token_ttl_minutes),
            reset_url_base: config.reset_url_base.trim_end_matches('/').to_string(),
            min_password_length: config.min_password_length,
        }
    }

    pub fn signer(&self) -> &Arc<TokenSigner> {
        &self.signer
    }

    fn check_new_password(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < self.min_password_length {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters long",
                self.min_password_length
            )));
        }
        Ok(())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("username and password are required".into()));
        }

        let Some(record) = self.store.fetch_credential_by_username(username).await? else {
            burn_verification_blocking(password.to_string()).await;
            tracing::info!(username = %username, "Login failed: unknown user");
            record_auth_event("login", "invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(password.to_string(), record.password_hash.clone()).await? {
            tracing::info!(account = record.id, "Login failed: wrong password");
            record_auth_event("login", "invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        }

        if record.inactive {
            tracing::info!(account = record.id, "Login refused: account inactive");
            record_auth_event("login", "inactive");
            return Err(AuthError::AccountInactive);
        }

        let identity = Identity {
            subject_id: record.id,
            username: record.username,
            role: record.role,
        };
        let now = Utc::now();
        let issued = self.signer.issue(&identity, now)?;
        let cookie = auth_cookie(
            &self.cookie_name,
            &issued.token,
            issued.expires_at,
            now,
            self.cookie_secure,
        );

        tracing::info!(account = identity.subject_id, role = identity.role.as_str(), "Login succeeded");
        record_auth_event("login", "success");

        Ok(LoginOutcome {
            identity,
            token: issued.token,
            expires_at: issued.expires_at,
            cookie,
        })
    }

    /// `Set-Cookie` value that clears the session. Tokens already handed
    /// out stay valid until they expire.
    pub fn logout(&self) -> String {
        record_auth_event("logout", "success");
        expired_cookie(&self.cookie_name, self.cookie_secure)
    }

    pub async fn update_password(
        &self,
        account: AccountId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(AuthError::Validation("current and new password are required".into()));
        }
        self.check_new_password(new_password)?;

        let Some(record) = self.store.fetch_credential_by_id(account).await? else {
            burn_verification_blocking(current_password.to_string()).await;
            tracing::info!(account, "Password update refused: unknown account");
            record_auth_event("update_password", "invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(current_password.to_string(), record.password_hash).await? {
            tracing::info!(account, "Password update refused: wrong current password");
            record_auth_event("update_password", "invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        }

        let hash = hash_password_blocking(new_password.to_string()).await?;
        self.store.update_password_hash(account, hash).await?;

        tracing::info!(account, "Password updated");
        record_auth_event("update_password", "success");
        Ok(())
    }

    /// Issue and deliver a reset link when `email` belongs to an account.
    /// Succeeds the same way when it does not.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::Validation("email is required".into()));
        }

        let Some(record) = self.store.fetch_account_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            record_auth_event("forgot_password", "unknown_email");
            return Ok(());
        };

        let expires_at = Utc::now() + self.reset_ttl;
        let token = self.store.create_reset_token(record.id, expires_at).await?;
        let reset_url = format!("{}/{}", self.reset_url_base, token);

        match self
            .notifier
            .send_reset_link(&record, &reset_url, self.reset_ttl)
            .await
        {
            Ok(()) => record_auth_event("forgot_password", "sent"),
            Err(e) => {
                tracing::error!(account = record.id, error = %e, "Reset link delivery failed");
                record_auth_event("forgot_password", "delivery_failed");
            }
        }
        Ok(())
    }

    fn reset_refused() -> AuthError {
        tracing::info!("Password reset refused: invalid or expired token");
        record_auth_event("reset_password", "invalid_token");
        AuthError::InvalidResetToken
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::Validation("reset token is required".into()));
        }
        if new_password != confirm_password {
            return Err(AuthError::Validation("passwords do not match".into()));
        }

        let token = token.trim();
        if !self.store.reset_token_valid(token, Utc::now()).await? {
            return Err(Self::reset_refused());
        }
        // Policy failures must leave a valid token usable.
        self.check_new_password(new_password)?;

        let Some(account) = self.store.consume_reset_token(token, Utc::now()).await? else {
            return Err(Self::reset_refused());
        };

        let hash = hash_password_blocking(new_password.to_string()).await?;
        self.store.update_password_hash(account, hash).await?;

        tracing::info!(account, "Password reset completed");
        record_auth_event("reset_password", "success");
        Ok(())
    }
}
