//! Session model and related functionality

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};

use crate::identity::IdentityToken;

/// Length of generated session ids (about 256 bits of entropy)
pub const SESSION_ID_LENGTH: usize = 43;

/// Server-side session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    /// Present only once a login succeeded on this session
    pub identity_token: Option<IdentityToken>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Allocate a fresh anonymous session with a new random id
    pub fn new(lifetime: Duration) -> Self {
        Self::new_at(Utc::now(), lifetime)
    }

    pub fn new_at(now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            session_id: generate_session_id(),
            identity_token: None,
            created_at: now,
            expires_at: now + lifetime,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity_token.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Time left before expiry, zero once expired
    pub fn remaining_at(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.expires_at - now).to_std().unwrap_or_default()
    }

    /// Shortened id for log lines
    pub fn log_id(&self) -> &str {
        let end = self.session_id.len().min(8);
        &self.session_id[..end]
    }
}

/// Generate an opaque session id from the thread-local CSPRNG
pub fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_anonymous_with_fixed_lifetime() {
        let now = Utc::now();
        let record = SessionRecord::new_at(now, Duration::days(7));

        assert!(!record.is_authenticated());
        assert_eq!(record.created_at, now);
        assert_eq!(record.expires_at - record.created_at, Duration::days(7));
        assert_eq!(record.session_id.len(), SESSION_ID_LENGTH);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_expiry_boundaries() {
        let now = Utc::now();
        let record = SessionRecord::new_at(now, Duration::seconds(60));

        assert!(!record.is_expired_at(now));
        assert!(record.is_expired_at(now + Duration::seconds(60)));
        assert_eq!(
            record.remaining_at(now + Duration::seconds(20)),
            std::time::Duration::from_secs(40)
        );
        assert_eq!(
            record.remaining_at(now + Duration::seconds(120)),
            std::time::Duration::ZERO
        );
    }
}
