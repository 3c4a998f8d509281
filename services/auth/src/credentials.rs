//! Credential verification for email/password logins

use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    error::{AuthError, AuthResult},
    models::{User, user::normalize_email},
    password::{dummy_hash, verify_password_blocking},
    repositories::UserDirectory,
    validation::validate_credentials,
};

/// Checks submitted credentials against the user directory
#[derive(Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserDirectory>,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    /// Return the identity matching `email` and `password`.
    ///
    /// Every mismatch is reported as [`AuthError::InvalidCredentials`], whether
    /// the email is unknown, malformed, or the password is wrong. An unknown
    /// email is still checked against a dummy hash so both cases take the same
    /// time. Directory failures surface as [`AuthError::StoreUnavailable`].
    pub async fn verify(&self, email: &str, password: &str) -> AuthResult<User> {
        if let Err(reason) = validate_credentials(&normalize_email(email), password) {
            debug!("Rejecting malformed credentials: {}", reason);
            return Err(AuthError::InvalidCredentials);
        }

        let user = self.users.find_by_email(email).await?;

        let hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => dummy_hash().to_string(),
        };
        let matches = verify_password_blocking(password.to_string(), hash).await?;

        match user {
            Some(user) if matches => {
                info!("Credentials verified for user: {}", user.id);
                Ok(user)
            }
            _ => {
                info!("Credential verification failed");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::repositories::InMemoryUserDirectory;
    use async_trait::async_trait;
    use uuid::Uuid;

    async fn verifier_with_user() -> (CredentialVerifier, User) {
        let directory = InMemoryUserDirectory::new();
        let user = directory
            .insert(&NewUser::new("a@x.com", "right"))
            .await
            .unwrap();
        (CredentialVerifier::new(Arc::new(directory)), user)
    }

    #[tokio::test]
    async fn test_matching_credentials_return_identity() {
        let (verifier, user) = verifier_with_user().await;
        let verified = verifier.verify("a@x.com", "right").await.unwrap();
        assert_eq!(verified, user);
    }

    #[tokio::test]
    async fn test_email_lookup_ignores_case() {
        let (verifier, user) = verifier_with_user().await;
        let verified = verifier.verify("A@X.COM", "right").await.unwrap();
        assert_eq!(verified.id, user.id);
    }

    #[tokio::test]
    async fn test_failures_are_indistinguishable() {
        let (verifier, _) = verifier_with_user().await;

        let wrong_password = verifier.verify("a@x.com", "wrong").await.unwrap_err();
        let unknown_email = verifier.verify("b@x.com", "right").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_malformed_credentials_are_invalid() {
        let (verifier, _) = verifier_with_user().await;

        for (email, password) in [("", "right"), ("a@x.com", ""), ("not-an-email", "right")] {
            let err = verifier.verify(email, password).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
    }

    struct UnreachableDirectory;

    #[async_trait]
    impl UserDirectory for UnreachableDirectory {
        async fn find_by_email(&self, _email: &str) -> AuthResult<Option<User>> {
            Err(AuthError::StoreUnavailable("connection refused".to_string()))
        }

        async fn find_by_id(&self, _id: Uuid) -> AuthResult<Option<User>> {
            Err(AuthError::StoreUnavailable("connection refused".to_string()))
        }

        async fn health_check(&self) -> AuthResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_directory_failure_is_not_invalid_credentials() {
        let verifier = CredentialVerifier::new(Arc::new(UnreachableDirectory));
        let err = verifier.verify("a@x.com", "right").await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_every_provisioned_account_can_log_in() {
        let directory = InMemoryUserDirectory::new();
        let verifier = CredentialVerifier::new(Arc::new(directory.clone()));

        let candidates = [
            (" Mixed.Case@Example.ORG ", "right".to_string()),
            ("ops@localhost", "right".to_string()),
            ("long@x.com", "p".repeat(128)),
            ("longer@x.com", "p".repeat(129)),
            ("spaces@x.com", " padded ".to_string()),
        ];

        let mut provisioned = 0;
        for (email, password) in candidates {
            match directory.insert(&NewUser::new(email, password.clone())).await {
                Ok(user) => {
                    provisioned += 1;
                    let verified = verifier.verify(email, &password).await.unwrap();
                    assert_eq!(verified.id, user.id);
                }
                Err(err) => assert!(matches!(err, AuthError::BadRequest(_))),
            }
        }
        assert_eq!(provisioned, 3);
    }
}
