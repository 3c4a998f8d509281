//! User directories: where identities are looked up

use async_trait::async_trait;
use uuid::Uuid;

use crate::{error::AuthResult, models::User};

pub mod memory;
pub mod user;

pub use memory::InMemoryUserDirectory;
pub use user::UserRepository;

/// Read access to registered identities
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by email. Implementations normalize the email first.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Find a user by id
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    /// Check that the backing store is reachable
    async fn health_check(&self) -> AuthResult<bool>;
}
