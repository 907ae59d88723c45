//! Email/password verification.
//!
//! An unknown email and a wrong password produce the same error and cost the
//! same amount of hashing work: a missing account is checked against a dummy
//! hash so response time does not reveal which accounts exist.

use tracing::debug;

use crate::user::normalize_email;
use crate::{AuthError, PasswordHasher, UserDirectory, UserSummary};

const DUMMY_PASSWORD: &str = "learnhub-timing-equalizer";

pub struct CredentialVerifier<D> {
    directory: D,
    hasher: PasswordHasher,
    dummy_hash: String,
}

impl<D> CredentialVerifier<D>
where
    D: UserDirectory,
{
    pub fn new(directory: D, hasher: PasswordHasher) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            directory,
            hasher,
            dummy_hash,
        })
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Verify `email`/`password` and return the sanitized account on success.
    ///
    /// Fails with [`AuthError::InvalidCredentials`] for an unknown email or a
    /// wrong password, and with [`AuthError::AccountDisabled`] only once the
    /// password has been proven correct.
    pub async fn verify(&self, email: &str, password: &str) -> Result<UserSummary, AuthError> {
        let email = normalize_email(email);
        let user = self.directory.find_by_email(&email).await?;

        let stored_hash = match &user {
            Some(u) => u.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let matches = self.check_password(password, stored_hash).await?;

        let Some(user) = user else {
            debug!("credential check failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if !matches {
            debug!(user_id = %user.id, "credential check failed: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active() {
            return Err(AuthError::AccountDisabled);
        }

        Ok(user.summary())
    }

    /// Hash a new password off the async executor.
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
    }

    async fn check_password(&self, password: &str, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use learnhub_core::UserId;

    use super::*;
    use crate::{HashingCost, NewUser, Role, StoreError, UserRecord, UserStatus};

    #[derive(Default)]
    struct MapDirectory {
        users: Mutex<HashMap<String, UserRecord>>,
    }

    #[async_trait]
    impl UserDirectory for MapDirectory {
        async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
            Ok(self.users.lock().unwrap().get(email).cloned())
        }

        async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.id == id)
                .cloned())
        }

        async fn create(
            &self,
            user: NewUser,
            now: DateTime<Utc>,
        ) -> Result<UserRecord, StoreError> {
            let record = UserRecord {
                id: UserId::new(),
                email: user.email.clone(),
                display_name: user.display_name,
                password_hash: user.password_hash,
                role: user.role,
                status: UserStatus::Active,
                created_at: now,
            };
            self.users.lock().unwrap().insert(user.email, record.clone());
            Ok(record)
        }
    }

    async fn verifier_with(
        email: &str,
        password: &str,
        status: UserStatus,
    ) -> CredentialVerifier<MapDirectory> {
        let hasher = PasswordHasher::new(HashingCost::minimal()).unwrap();
        let verifier = CredentialVerifier::new(MapDirectory::default(), hasher).unwrap();
        let hash = verifier.hash_password(password).await.unwrap();
        let mut user = verifier
            .directory()
            .create(
                NewUser {
                    email: email.to_string(),
                    display_name: "Alice".to_string(),
                    password_hash: hash,
                    role: Role::Student,
                },
                Utc::now(),
            )
            .await
            .unwrap();
        user.status = status;
        verifier
            .directory()
            .users
            .lock()
            .unwrap()
            .insert(email.to_string(), user);
        verifier
    }

    #[tokio::test]
    async fn correct_credentials_return_summary() {
        let v = verifier_with("a@x.com", "correct", UserStatus::Active).await;
        let summary = v.verify("a@x.com", "correct").await.unwrap();
        assert_eq!(summary.email, "a@x.com");
        assert_eq!(summary.role, Role::Student);
    }

    #[tokio::test]
    async fn email_lookup_is_normalized() {
        let v = verifier_with("a@x.com", "correct", UserStatus::Active).await;
        assert!(v.verify("  A@X.com", "correct").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let v = verifier_with("a@x.com", "correct", UserStatus::Active).await;
        let wrong_password = v.verify("a@x.com", "nope").await.unwrap_err();
        let unknown_email = v.verify("b@x.com", "correct").await.unwrap_err();
        assert_eq!(wrong_password, AuthError::InvalidCredentials);
        assert_eq!(unknown_email, wrong_password);
        assert_eq!(unknown_email.to_string(), wrong_password.to_string());
    }

    #[tokio::test]
    async fn suspended_account_is_reported_only_after_password_matches() {
        let v = verifier_with("a@x.com", "correct", UserStatus::Suspended).await;
        assert_eq!(
            v.verify("a@x.com", "wrong").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            v.verify("a@x.com", "correct").await.unwrap_err(),
            AuthError::AccountDisabled
        );
    }
}
