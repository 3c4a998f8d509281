//! Session persistence
//!
//! A [`SessionStore`] maps session ids to [`SessionRecord`]s. Two backends are
//! provided:
//! - [`RedisSessionStore`]: shared Redis instance, for production
//! - [`MemorySessionStore`]: in-process `moka` cache, for single-instance
//!   deployments and tests
//!
//! Both give per-key atomic writes without a store-wide lock. Concurrent `put`s
//! to the same id are last-write-wins.

pub mod memory;
pub mod redis;

use async_trait::async_trait;

use crate::{error::AuthResult, models::SessionRecord};

pub use memory::MemorySessionStore;
pub use redis::RedisSessionStore;

/// Persistence for session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a record. Expired records are reported as `None`.
    async fn get(&self, session_id: &str) -> AuthResult<Option<SessionRecord>>;

    /// Insert or replace a record. The backend keeps it no longer than its
    /// remaining lifetime; an already-expired record is removed instead.
    async fn put(&self, record: &SessionRecord) -> AuthResult<()>;

    /// Remove a record. Removing an unknown id is not an error.
    async fn delete(&self, session_id: &str) -> AuthResult<()>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> AuthResult<bool>;
}
