//! Infrastructure layer: storage adapters, configuration and session orchestration.

pub mod config;
pub mod db;
pub mod session_lifecycle;
pub mod session_store;
pub mod sweeper;
pub mod user_directory;

pub use config::{AuthConfig, ConfigError, ServerConfig, StorageBackend};
pub use session_lifecycle::{AuthSession, Registration, SessionLifecycle};
pub use session_store::{InMemorySessionStore, PostgresSessionStore};
pub use sweeper::{SweeperHandle, spawn_session_sweeper, sweep_once};
pub use user_directory::{InMemoryUserDirectory, PostgresUserDirectory};
