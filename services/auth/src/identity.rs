//! Conversion between verified identities and session tokens

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::{error::AuthResult, models::User, repositories::UserDirectory};

/// Opaque reference to a user, stored inside a session record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityToken(String);

impl IdentityToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for IdentityToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serializes identities to tokens and resolves them back
#[derive(Clone)]
pub struct IdentitySerializer {
    users: Arc<dyn UserDirectory>,
}

impl IdentitySerializer {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    /// Only the user id goes into the session.
    pub fn serialize(&self, user: &User) -> IdentityToken {
        IdentityToken(user.id.hyphenated().to_string())
    }

    /// Resolve a token to its user.
    ///
    /// Returns `Ok(None)` for a dangling token: one that does not parse or
    /// whose user has since been removed. Directory failures are errors.
    pub async fn deserialize(&self, token: &IdentityToken) -> AuthResult<Option<User>> {
        let id = match Uuid::parse_str(token.as_str()) {
            Ok(id) => id,
            Err(_) => {
                debug!("Ignoring malformed identity token");
                return Ok(None);
            }
        };

        let user = self.users.find_by_id(id).await?;
        if user.is_none() {
            debug!("Identity token refers to missing user: {}", id);
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::repositories::InMemoryUserDirectory;

    #[tokio::test]
    async fn test_round_trip() {
        let directory = InMemoryUserDirectory::new();
        let user = directory
            .insert(&NewUser::new("a@x.com", "right"))
            .await
            .unwrap();
        let serializer = IdentitySerializer::new(Arc::new(directory));

        let token = serializer.serialize(&user);
        assert_eq!(token.as_str(), user.id.to_string());
        assert!(!token.as_str().contains("argon2"));
        assert_eq!(serializer.deserialize(&token).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_deleted_user_is_dangling() {
        let directory = InMemoryUserDirectory::new();
        let user = directory
            .insert(&NewUser::new("a@x.com", "right"))
            .await
            .unwrap();
        let serializer = IdentitySerializer::new(Arc::new(directory.clone()));
        let token = serializer.serialize(&user);

        directory.remove(user.id).await;

        assert_eq!(serializer.deserialize(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_token_is_dangling() {
        let serializer = IdentitySerializer::new(Arc::new(InMemoryUserDirectory::new()));
        let token = IdentityToken::from("not-a-uuid".to_string());
        assert_eq!(serializer.deserialize(&token).await.unwrap(), None);
    }

    #[test]
    fn test_token_serializes_as_plain_string() {
        let token = IdentityToken::from("abc".to_string());
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"abc\"");
    }
}
