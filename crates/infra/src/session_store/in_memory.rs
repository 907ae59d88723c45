use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use learnhub_auth::{RefreshTokenRecord, SessionStore, StoreError};
use learnhub_core::UserId;

/// In-memory session store keyed by token.
///
/// Intended for tests/dev. Every operation holds the write lock for its whole
/// duration, which makes each one atomic.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    by_token: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All live records of a user. Test/diagnostic helper.
    pub fn records_for_user(&self, user_id: UserId) -> Vec<RefreshTokenRecord> {
        match self.by_token.read() {
            Ok(map) => map
                .values()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect(),
            Err(_) => vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.by_token.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::backend("session store lock poisoned")
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        let mut map = self.by_token.write().map_err(|_| poisoned())?;
        map.retain(|_, r| r.user_id != record.user_id);
        map.insert(record.token.clone(), record);
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let map = self.by_token.read().map_err(|_| poisoned())?;
        Ok(map.get(token).cloned())
    }

    async fn delete_by_token(&self, token: &str) -> Result<(), StoreError> {
        let mut map = self.by_token.write().map_err(|_| poisoned())?;
        map.remove(token);
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<u64, StoreError> {
        let mut map = self.by_token.write().map_err(|_| poisoned())?;
        let before = map.len();
        map.retain(|_, r| r.user_id != user_id);
        Ok((before - map.len()) as u64)
    }

    async fn rotate(
        &self,
        old_token: &str,
        replacement: RefreshTokenRecord,
    ) -> Result<bool, StoreError> {
        let mut map = self.by_token.write().map_err(|_| poisoned())?;
        if map.remove(old_token).is_none() {
            return Ok(false);
        }
        map.retain(|_, r| r.user_id != replacement.user_id);
        map.insert(replacement.token.clone(), replacement);
        Ok(true)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut map = self.by_token.write().map_err(|_| poisoned())?;
        let before = map.len();
        map.retain(|_, r| !r.is_expired(now));
        Ok((before - map.len()) as u64)
    }
}
