//! Redis-backed session store

use async_trait::async_trait;
use chrono::Utc;
use common::cache::RedisPool;
use tracing::warn;

use super::SessionStore;
use crate::{
    error::{AuthError, AuthResult},
    models::SessionRecord,
};

/// Prefix of every session key
const KEY_PREFIX: &str = "sess:";

/// Session store backed by Redis
///
/// Records are JSON values written with `SET EX`, so Redis reclaims them once
/// their lifetime runs out.
#[derive(Clone)]
pub struct RedisSessionStore {
    redis_pool: RedisPool,
}

impl RedisSessionStore {
    pub fn new(redis_pool: RedisPool) -> Self {
        Self { redis_pool }
    }

    fn key(session_id: &str) -> String {
        format!("{}{}", KEY_PREFIX, session_id)
    }
}

/// Decode a stored value; corrupt or expired values count as missing
fn decode(session_id: &str, raw: &str) -> Option<SessionRecord> {
    match serde_json::from_str::<SessionRecord>(raw) {
        Ok(record) if record.session_id == session_id && !record.is_expired() => Some(record),
        Ok(_) => None,
        Err(e) => {
            warn!("Discarding unreadable session record: {}", e);
            None
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, session_id: &str) -> AuthResult<Option<SessionRecord>> {
        let key = Self::key(session_id);
        let Some(raw) = self.redis_pool.get(&key).await? else {
            return Ok(None);
        };

        let record = decode(session_id, &raw);
        if record.is_none() {
            self.redis_pool.delete(&key).await?;
        }

        Ok(record)
    }

    async fn put(&self, record: &SessionRecord) -> AuthResult<()> {
        let key = Self::key(&record.session_id);
        let ttl = record.remaining_at(Utc::now()).as_secs();
        if ttl == 0 {
            self.redis_pool.delete(&key).await?;
            return Ok(());
        }

        let value = serde_json::to_string(record)
            .map_err(|e| AuthError::Internal(format!("Failed to encode session: {}", e)))?;

        self.redis_pool.set(&key, &value, Some(ttl)).await?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> AuthResult<()> {
        self.redis_pool.delete(&Self::key(session_id)).await?;
        Ok(())
    }

    async fn health_check(&self) -> AuthResult<bool> {
        Ok(self.redis_pool.health_check().await?)
    }
}
