//! Postgres-backed user directory.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use learnhub_auth::{NewUser, Role, StoreError, UserDirectory, UserRecord, UserStatus};
use learnhub_core::UserId;

use crate::db::map_sqlx_error;

#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: Arc<PgPool>,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

const SELECT_USER: &str = r#"
    SELECT id, email, display_name, password_hash, role, status, created_at
    FROM users
"#;

fn user_from_row(operation: &str, row: &sqlx::postgres::PgRow) -> Result<UserRecord, StoreError> {
    let decode = |e| map_sqlx_error(operation, e);

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let role: String = row.try_get("role").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;

    let role: Role = role
        .parse()
        .map_err(|e| StoreError::backend(format!("bad role in users row: {e}")))?;
    let status = UserStatus::parse(&status)
        .ok_or_else(|| StoreError::backend(format!("bad status in users row: {status}")))?;

    Ok(UserRecord {
        id: UserId::from_uuid(id),
        email: row.try_get("email").map_err(decode)?,
        display_name: row.try_get("display_name").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        role,
        status,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    #[instrument(skip_all, err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_email", e))?;
        row.as_ref()
            .map(|r| user_from_row("find_by_email", r))
            .transpose()
    }

    #[instrument(skip_all, fields(user_id = %id), err)]
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;
        row.as_ref()
            .map(|r| user_from_row("find_by_id", r))
            .transpose()
    }

    #[instrument(skip_all, fields(role = %user.role), err)]
    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<UserRecord, StoreError> {
        let record = UserRecord {
            id: UserId::new(),
            email: user.email,
            display_name: user.display_name,
            password_hash: user.password_hash,
            role: user.role,
            status: UserStatus::Active,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, password_hash, role, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.email)
        .bind(&record.display_name)
        .bind(&record.password_hash)
        .bind(record.role.as_str())
        .bind(record.status.as_str())
        .bind(record.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;

        Ok(record)
    }
}
