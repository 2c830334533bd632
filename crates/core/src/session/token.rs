//! In-memory session provider.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{Credential, SessionError, SessionProvider};

/// Session provider holding the credential of one signed-in user.
///
/// The embedding application keeps it current with [`TokenSession::set`]
/// whenever the identity provider refreshes the token, and calls
/// [`TokenSession::clear`] on sign-out.
#[derive(Debug, Default)]
pub struct TokenSession {
    credential: RwLock<Option<Credential>>,
}

impl TokenSession {
    /// Create a provider with no credential.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a provider that already holds a token.
    pub fn new(credential: Credential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }

    pub async fn set(&self, credential: Credential) {
        *self.credential.write().await = Some(credential);
    }

    pub async fn clear(&self) {
        *self.credential.write().await = None;
    }

    pub async fn is_signed_in(&self) -> bool {
        self.credential
            .read()
            .await
            .as_ref()
            .is_some_and(|c| !c.is_expired_at(Utc::now()))
    }
}

#[async_trait]
impl SessionProvider for TokenSession {
    async fn credential(&self) -> Result<Credential, SessionError> {
        let guard = self.credential.read().await;
        let credential = guard.as_ref().ok_or(SessionError::NotAuthenticated)?;
        if credential.is_expired_at(Utc::now()) {
            return Err(SessionError::Expired);
        }
        Ok(credential.clone())
    }

    fn provider_name(&self) -> &'static str {
        "token"
    }
}
