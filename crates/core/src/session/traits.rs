use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use super::types::Credential;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("No active session")]
    NotAuthenticated,

    #[error("Session credential expired")]
    Expired,

    #[error("Session provider unavailable: {0}")]
    Unavailable(String),
}

/// Source of the bearer credential attached to every job service call.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current credential for the signed-in user.
    async fn credential(&self) -> Result<Credential, SessionError>;

    /// Name of this provider, for logs.
    fn provider_name(&self) -> &'static str;
}

/// Fetch a credential and reject it if it has already expired.
///
/// Callers must go through this before issuing any remote request.
pub async fn validated_credential(
    provider: &dyn SessionProvider,
) -> Result<Credential, SessionError> {
    let credential = provider.credential().await?;
    if credential.is_expired_at(Utc::now()) {
        return Err(SessionError::Expired);
    }
    Ok(credential)
}
