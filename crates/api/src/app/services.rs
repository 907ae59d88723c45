//! Service wiring: pick storage adapters and build the session lifecycle.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use learnhub_auth::{AuthError, SessionStore, StoreError, UserDirectory};
use learnhub_core::Clock;
use learnhub_infra::{
    AuthConfig, InMemorySessionStore, InMemoryUserDirectory, PostgresSessionStore,
    PostgresUserDirectory, SessionLifecycle, StorageBackend, db,
};

/// Lifecycle over runtime-selected storage.
pub type DynSessionLifecycle = SessionLifecycle<Arc<dyn UserDirectory>, Arc<dyn SessionStore>>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("storage setup failed: {0}")]
    Storage(#[from] StoreError),

    #[error("auth setup failed: {0}")]
    Auth(#[from] AuthError),
}

pub struct AppServices {
    pub lifecycle: DynSessionLifecycle,
    /// Same store the lifecycle writes to; shared with the background sweeper.
    pub sessions: Arc<dyn SessionStore>,
    pub clock: Arc<dyn Clock>,
}

pub async fn build_services(
    auth: &AuthConfig,
    storage: &StorageBackend,
    clock: Arc<dyn Clock>,
) -> Result<AppServices, ServiceError> {
    let (users, sessions): (Arc<dyn UserDirectory>, Arc<dyn SessionStore>) = match storage {
        StorageBackend::InMemory => {
            info!("using in-memory user directory and session store");
            (
                Arc::new(InMemoryUserDirectory::new()),
                Arc::new(InMemorySessionStore::new()),
            )
        }
        StorageBackend::Postgres { database_url } => {
            let pool = db::connect(database_url).await?;
            db::ensure_schema(&pool).await?;
            info!("using postgres user directory and session store");
            (
                Arc::new(PostgresUserDirectory::new(pool.clone())),
                Arc::new(PostgresSessionStore::new(pool)),
            )
        }
    };

    let lifecycle = SessionLifecycle::new(users, sessions.clone(), auth, clock.clone())?;
    Ok(AppServices {
        lifecycle,
        sessions,
        clock,
    })
}
