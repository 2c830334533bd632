use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer credential issued by the identity provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// A blank token counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.token.trim().is_empty() {
            return true;
        }
        matches!(self.expires_at, Some(at) if at <= now)
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_credential_without_expiry_never_expires() {
        let credential = Credential::new("abc");
        assert!(!credential.is_expired_at(Utc::now() + Duration::days(3650)));
    }

    #[test]
    fn test_credential_expiry() {
        let now = Utc::now();
        let credential = Credential::new("abc").with_expiry(now);
        assert!(credential.is_expired_at(now));
        assert!(!credential.is_expired_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_blank_token_is_expired() {
        assert!(Credential::new("  ").is_expired_at(Utc::now()));
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(Credential::new("tok").bearer(), "Bearer tok");
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", Credential::new("super-secret"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
