//! Delivery of password reset links.

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

use super::store::CredentialRecord;

#[derive(Debug, Error)]
#[error("failed to deliver reset link: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait ResetNotifier: Send + Sync + 'static {
    async fn send_reset_link(
        &self,
        account: &CredentialRecord,
        reset_url: &str,
        valid_for: Duration,
    ) -> Result<(), NotifyError>;
}

/// Writes the reset link to the log. Development only: the link is a
/// credential.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl ResetNotifier for LogNotifier {
    async fn send_reset_link(
        &self,
        account: &CredentialRecord,
        reset_url: &str,
        valid_for: Duration,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            account = account.id,
            email = %account.email,
            reset_url = %reset_url,
            valid_minutes = valid_for.num_minutes(),
            "Password reset link issued"
        );
        Ok(())
    }
}
