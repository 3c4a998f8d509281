//! In-memory session store using moka

use async_trait::async_trait;
use chrono::Utc;
use moka::{Expiry, future::Cache};
use std::time::{Duration, Instant};

use super::SessionStore;
use crate::{error::AuthResult, models::SessionRecord};

/// Default maximum number of sessions held
const DEFAULT_MAX_CAPACITY: u64 = 100_000;

/// Evicts each entry when its session expires
struct SessionExpiry;

impl Expiry<String, SessionRecord> for SessionExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &SessionRecord,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.remaining_at(Utc::now()))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &SessionRecord,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.remaining_at(Utc::now()))
    }
}

/// Session store held in process memory
#[derive(Clone)]
pub struct MemorySessionStore {
    cache: Cache<String, SessionRecord>,
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(SessionExpiry)
            .build();

        Self { cache }
    }

    /// Approximate number of stored sessions
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> AuthResult<Option<SessionRecord>> {
        match self.cache.get(session_id).await {
            Some(record) if record.is_expired() => {
                self.cache.invalidate(session_id).await;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn put(&self, record: &SessionRecord) -> AuthResult<()> {
        if record.is_expired() {
            self.cache.invalidate(&record.session_id).await;
            return Ok(());
        }

        self.cache
            .insert(record.session_id.clone(), record.clone())
            .await;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> AuthResult<()> {
        self.cache.invalidate(session_id).await;
        Ok(())
    }

    async fn health_check(&self) -> AuthResult<bool> {
        Ok(true)
    }
}
