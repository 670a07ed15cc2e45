//! Authenticated caller identity.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Account identifier as stored by the credential store.
pub type AccountId = u64;

/// Role carried in the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Exec,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Exec => "exec",
        }
    }
}

/// Identity of the caller, published into request extensions by the
/// token authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: AccountId,
    pub username: String,
    pub role: Role,
}

impl Identity {
    /// 403 unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            tracing::debug!(
                subject = self.subject_id,
                role = self.role.as_str(),
                "Insufficient role"
            );
            Err(ApiError::Forbidden(
                "you do not have permission to perform this action".into(),
            ))
        }
    }

    /// True for the account itself or an admin.
    pub fn may_act_for(&self, account: AccountId) -> bool {
        self.subject_id == account || self.role == Role::Admin
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthenticated("authentication required".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn exec() -> Identity {
        Identity {
            subject_id: 7,
            username: "jdoe".into(),
            role: Role::Exec,
        }
    }

    #[test]
    fn test_require_role() {
        let identity = exec();
        assert!(identity.require_role(&[Role::Exec, Role::Admin]).is_ok());
        let err = identity.require_role(&[Role::Admin]).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_may_act_for() {
        let identity = exec();
        assert!(identity.may_act_for(7));
        assert!(!identity.may_act_for(8));

        let admin = Identity { role: Role::Admin, ..exec() };
        assert!(admin.may_act_for(8));
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"manager\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[tokio::test]
    async fn test_extractor() {
        let (mut parts, _) = Request::new(()).into_parts();
        let missing = Identity::from_request_parts(&mut parts, &()).await;
        assert!(matches!(missing, Err(ApiError::Unauthenticated(_))));

        parts.extensions.insert(exec());
        let found = Identity::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(found, exec());
    }
}
