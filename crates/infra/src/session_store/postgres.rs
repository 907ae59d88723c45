//! Postgres-backed session store.
//!
//! The unique index on `refresh_tokens.user_id` enforces one session per
//! user at the database level. `put` is a single upsert and `rotate` is a
//! transaction whose first statement deletes the old token: a concurrent
//! rotation of the same token blocks on that row and then finds it gone.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use learnhub_auth::{ClientMeta, RefreshTokenRecord, SessionStore, StoreError};
use learnhub_core::{SessionId, UserId};

use crate::db::map_sqlx_error;

#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    pool: Arc<PgPool>,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

const UPSERT: &str = r#"
    INSERT INTO refresh_tokens (id, user_id, token, user_agent, ip, created_at, expires_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    ON CONFLICT (user_id) DO UPDATE SET
        id = EXCLUDED.id,
        token = EXCLUDED.token,
        user_agent = EXCLUDED.user_agent,
        ip = EXCLUDED.ip,
        created_at = EXCLUDED.created_at,
        expires_at = EXCLUDED.expires_at
"#;

async fn upsert(
    tx: &mut Transaction<'_, Postgres>,
    record: &RefreshTokenRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(UPSERT)
        .bind(record.id.as_uuid())
        .bind(record.user_id.as_uuid())
        .bind(&record.token)
        .bind(record.client.user_agent.as_deref())
        .bind(record.client.ip.as_deref())
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<RefreshTokenRecord, sqlx::Error> {
    let id: Uuid = row.try_get("id")?;
    let user_id: Uuid = row.try_get("user_id")?;
    Ok(RefreshTokenRecord {
        id: SessionId::from_uuid(id),
        user_id: UserId::from_uuid(user_id),
        token: row.try_get("token")?,
        client: ClientMeta::new(row.try_get("user_agent")?, row.try_get("ip")?),
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    #[instrument(skip_all, fields(user_id = %record.user_id), err)]
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("put", e))?;
        upsert(&mut tx, &record)
            .await
            .map_err(|e| map_sqlx_error("put", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("put", e))
    }

    #[instrument(skip_all, err)]
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, token, user_agent, ip, created_at, expires_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_token", e))?;

        row.as_ref()
            .map(record_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_by_token", e))
    }

    #[instrument(skip_all, err)]
    async fn delete_by_token(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_by_token", e))?;
        Ok(())
    }

    #[instrument(skip_all, fields(user_id = %user_id), err)]
    async fn delete_all_for_user(&self, user_id: UserId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_all_for_user", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip_all, fields(user_id = %replacement.user_id), err)]
    async fn rotate(
        &self,
        old_token: &str,
        replacement: RefreshTokenRecord,
    ) -> Result<bool, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("rotate", e))?;

        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(old_token)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("rotate", e))?
            .rows_affected();

        if deleted == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rotate", e))?;
            return Ok(false);
        }

        upsert(&mut tx, &replacement)
            .await
            .map_err(|e| map_sqlx_error("rotate", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("rotate", e))?;
        Ok(true)
    }

    #[instrument(skip(self), err)]
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_expired", e))?;
        Ok(result.rows_affected())
    }
}
