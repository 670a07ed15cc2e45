//! Credential persistence.
//!
//! [`CredentialStore`] is the only view of persistence the auth lifecycle
//! needs. [`InMemoryCredentialStore`] backs development and tests.
//!
//! Reset tokens are random 32-byte values handed to the account owner once;
//! the store keeps only their SHA-256 digest. Consuming a token removes it,
//! so it succeeds at most once.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::identity::{AccountId, Role};

/// Stored credentials of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub role: Role,
    pub inactive: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account {0} not found")]
    NotFound(AccountId),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    async fn fetch_credential_by_username(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError>;

    async fn fetch_credential_by_id(&self, id: AccountId) -> Result<Option<CredentialRecord>, StoreError>;

    async fn fetch_account_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError>;

    async fn update_password_hash(&self, id: AccountId, password_hash: String) -> Result<(), StoreError>;

    /// Issue a reset token for `id`, invalidating any earlier one.
    async fn create_reset_token(&self, id: AccountId, expires_at: DateTime<Utc>) -> Result<String, StoreError>;

    /// Whether `token` is known and unexpired at `now`. Leaves it in place.
    async fn reset_token_valid(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Atomically consume `token`. `None` when unknown, already used or
    /// expired at `now`.
    async fn consume_reset_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<AccountId>, StoreError>;
}

/// Digest under which a reset token is stored.
pub fn reset_token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Clone)]
struct ResetEntry {
    account: AccountId,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    accounts: DashMap<AccountId, CredentialRecord>,
    reset_tokens: DashMap<String, ResetEntry>,
    next_id: AtomicU64,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account and return its id.
    pub fn add_account(
        &self,
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> AccountId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.accounts.insert(
            id,
            CredentialRecord {
                id,
                username: username.into(),
                email: email.into(),
                password_hash: password_hash.into(),
                role,
                inactive: false,
            },
        );
        id
    }

    pub fn set_inactive(&self, id: AccountId, inactive: bool) -> Result<(), StoreError> {
        let mut record = self.accounts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.inactive = inactive;
        Ok(())
    }

    pub fn pending_reset_tokens(&self) -> usize {
        self.reset_tokens.len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn fetch_credential_by_username(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self
            .accounts
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.value().clone()))
    }

    async fn fetch_credential_by_id(&self, id: AccountId) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.accounts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn fetch_account_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self
            .accounts
            .iter()
            .find(|entry| entry.email.eq_ignore_ascii_case(email))
            .map(|entry| entry.value().clone()))
    }

    async fn update_password_hash(&self, id: AccountId, password_hash: String) -> Result<(), StoreError> {
        let mut record = self.accounts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.password_hash = password_hash;
        Ok(())
    }

    async fn create_reset_token(&self, id: AccountId, expires_at: DateTime<Utc>) -> Result<String, StoreError> {
        if !self.accounts.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }

        self.reset_tokens.retain(|_, entry| entry.account != id);
        let token = generate_reset_token();
        self.reset_tokens.insert(
            reset_token_digest(&token),
            ResetEntry {
                account: id,
                expires_at,
            },
        );
        Ok(token)
    }

    async fn reset_token_valid(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(self
            .reset_tokens
            .get(&reset_token_digest(token))
            .is_some_and(|entry| now <= entry.expires_at))
    }

    async fn consume_reset_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<AccountId>, StoreError> {
        Ok(self
            .reset_tokens
            .remove(&reset_token_digest(token))
            .and_then(|(_, entry)| (now <= entry.expires_at).then_some(entry.account)))
    }
}
