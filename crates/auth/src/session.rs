//! Refresh-token session records and the store contract.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use learnhub_core::{SessionId, UserId};

use crate::StoreError;

/// Best-effort metadata about the client that obtained a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMeta {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

impl ClientMeta {
    pub fn new(user_agent: Option<String>, ip: Option<String>) -> Self {
        Self { user_agent, ip }
    }
}

/// The single live refresh session of a user.
///
/// # Invariants
/// - At most one record exists per `user_id`.
/// - `token` is unique across all records.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: SessionId,
    pub user_id: UserId,
    pub token: String,
    pub client: ClientMeta,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(
        user_id: UserId,
        token: String,
        client: ClientMeta,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            token,
            client,
            created_at,
            expires_at,
        }
    }

    /// Expired once `now` is strictly past `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

impl core::fmt::Debug for RefreshTokenRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RefreshTokenRecord")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .field("client", &self.client)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Durable refresh-session storage.
///
/// Each method must be atomic on its own. Sequences of calls are not.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Replace every session of `record.user_id` with `record`.
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Remove the record holding `token`. Removing an unknown token is not an error.
    async fn delete_by_token(&self, token: &str) -> Result<(), StoreError>;

    /// Remove every session of a user, returning how many were removed.
    async fn delete_all_for_user(&self, user_id: UserId) -> Result<u64, StoreError>;

    /// Compare-and-swap rotation.
    ///
    /// If `old_token` still has a record, delete it together with any other
    /// session of `replacement.user_id`, insert `replacement` and return `true`.
    /// If `old_token` is already gone, change nothing and return `false`.
    async fn rotate(
        &self,
        old_token: &str,
        replacement: RefreshTokenRecord,
    ) -> Result<bool, StoreError>;

    /// Remove every record with `expires_at < now`, returning how many were removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[async_trait]
impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        (**self).put(record).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        (**self).find_by_token(token).await
    }

    async fn delete_by_token(&self, token: &str) -> Result<(), StoreError> {
        (**self).delete_by_token(token).await
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<u64, StoreError> {
        (**self).delete_all_for_user(user_id).await
    }

    async fn rotate(
        &self,
        old_token: &str,
        replacement: RefreshTokenRecord,
    ) -> Result<bool, StoreError> {
        (**self).rotate(old_token, replacement).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        (**self).delete_expired(now).await
    }
}
