use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use learnhub_auth::{NewUser, Role, StoreError, UserDirectory, UserRecord, UserStatus};
use learnhub_core::UserId;

/// In-memory user directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change a user's role. Returns `false` if the user does not exist.
    pub fn set_role(&self, id: UserId, role: Role) -> bool {
        self.update(id, |u| u.role = role)
    }

    /// Change a user's status. Returns `false` if the user does not exist.
    pub fn set_status(&self, id: UserId, status: UserStatus) -> bool {
        self.update(id, |u| u.status = status)
    }

    /// Remove a user. Returns `false` if the user did not exist.
    pub fn remove(&self, id: UserId) -> bool {
        match self.users.write() {
            Ok(mut map) => map.remove(&id).is_some(),
            Err(_) => false,
        }
    }

    fn update(&self, id: UserId, f: impl FnOnce(&mut UserRecord)) -> bool {
        let Ok(mut map) = self.users.write() else {
            return false;
        };
        match map.get_mut(&id) {
            Some(user) => {
                f(user);
                true
            }
            None => false,
        }
    }
}

fn poisoned() -> StoreError {
    StoreError::backend("user directory lock poisoned")
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let map = self.users.read().map_err(|_| poisoned())?;
        Ok(map.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let map = self.users.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<UserRecord, StoreError> {
        let mut map = self.users.write().map_err(|_| poisoned())?;
        if map.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email already registered: {}",
                user.email
            )));
        }

        let record = UserRecord {
            id: UserId::new(),
            email: user.email,
            display_name: user.display_name,
            password_hash: user.password_hash,
            role: user.role,
            status: UserStatus::Active,
            created_at: now,
        };
        map.insert(record.id, record.clone());
        Ok(record)
    }
}
