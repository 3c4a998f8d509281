//! In-process user directory for single-node demos and tests

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::UserDirectory;
use crate::{
    error::{AuthError, AuthResult},
    models::{NewUser, User, user::normalize_email},
    password::hash_password_blocking,
    validation::validate_credentials,
};

/// User directory held in memory
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a user, hashing the password. An existing user with the same
    /// email is replaced. Credentials that login would refuse are rejected.
    pub async fn insert(&self, new_user: &NewUser) -> AuthResult<User> {
        let email = normalize_email(&new_user.email);
        validate_credentials(&email, &new_user.password).map_err(AuthError::BadRequest)?;
        let password_hash = hash_password_blocking(new_user.password.clone()).await?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        let mut users = self.users.write().await;
        users.retain(|_, existing| existing.email != user.email);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Remove a user, returning whether one was present
    pub async fn remove(&self, id: Uuid) -> bool {
        self.users.write().await.remove(&id).is_some()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn health_check(&self) -> AuthResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let directory = InMemoryUserDirectory::new();
        let user = directory
            .insert(&NewUser::new("A@X.com", "right"))
            .await
            .unwrap();

        assert_eq!(user.email, "a@x.com");
        assert_ne!(user.password_hash, "right");
        assert_eq!(
            directory.find_by_email(" a@x.COM").await.unwrap(),
            Some(user.clone())
        );
        assert_eq!(directory.find_by_id(user.id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_remove() {
        let directory = InMemoryUserDirectory::new();
        let user = directory
            .insert(&NewUser::new("a@x.com", "right"))
            .await
            .unwrap();

        assert!(directory.remove(user.id).await);
        assert!(!directory.remove(user.id).await);
        assert_eq!(directory.find_by_email("a@x.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_replaces_same_email() {
        let directory = InMemoryUserDirectory::new();
        let first = directory.insert(&NewUser::new("a@x.com", "one")).await.unwrap();
        let second = directory.insert(&NewUser::new("a@x.com", "two")).await.unwrap();

        assert_eq!(directory.find_by_id(first.id).await.unwrap(), None);
        assert_eq!(
            directory.find_by_email("a@x.com").await.unwrap(),
            Some(second)
        );
    }

    #[tokio::test]
    async fn test_insert_rejects_credentials_login_would_refuse() {
        let directory = InMemoryUserDirectory::new();

        for (email, password) in [
            ("ops@localhost", "right".to_string()),
            ("a@x.com", String::new()),
            ("a@x.com", "p".repeat(129)),
        ] {
            let err = directory
                .insert(&NewUser::new(email, password))
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::BadRequest(_)));
        }
        assert_eq!(directory.find_by_email("ops@localhost").await.unwrap(), None);
    }
}
