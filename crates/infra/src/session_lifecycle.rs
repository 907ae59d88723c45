//! Session lifecycle orchestration (login, registration, refresh, logout).
//!
//! ## Refresh flow
//!
//! ```text
//! refresh token
//!   ↓
//! 1. find_by_token            (missing ⇒ InvalidRefreshToken, no mutation)
//!   ↓
//! 2. record.expires_at        (past ⇒ record deleted, ExpiredRefreshToken)
//!   ↓
//! 3. signature + subject      (broken ⇒ TamperedToken)
//!   ↓
//! 4. current user record      (gone or suspended ⇒ UserNotFound)
//!   ↓
//! 5. issue new pair from the freshly read role
//!   ↓
//! 6. rotate(old ⇒ new)        (old already gone ⇒ InvalidRefreshToken)
//! ```
//!
//! Step 6 is a compare-and-swap: of two concurrent refreshes presenting the
//! same token, exactly one rotates and the other receives no tokens.

use std::sync::Arc;

use tracing::{error, info, warn};

use learnhub_auth::{
    AuthError, ClientMeta, CredentialVerifier, IssuedTokens, NewUser, PasswordHasher, Principal,
    RefreshTokenRecord, Role, SessionStore, StoreError, TokenIssuer, UserDirectory, UserSummary,
    normalize_email,
};
use learnhub_core::{Clock, DomainError, UserId};

use crate::config::AuthConfig;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Result of a login, registration or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub tokens: IssuedTokens,
    pub user: UserSummary,
}

/// Self-service account creation request.
#[derive(Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub display_name: String,
    /// Defaults to [`Role::Student`].
    pub role: Option<Role>,
}

impl core::fmt::Debug for Registration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl Registration {
    /// Normalize and validate, returning the email and role to store.
    fn validate(&self) -> Result<(String, Role), DomainError> {
        let email = normalize_email(&self.email);
        let well_formed = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };
        if !well_formed || email.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("email address is malformed"));
        }
        if self.display_name.trim().is_empty() {
            return Err(DomainError::validation("display name must not be empty"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let role = self.role.unwrap_or_default();
        if !role.is_self_assignable() {
            return Err(DomainError::validation(format!(
                "role '{role}' cannot be self-assigned"
            )));
        }
        Ok((email, role))
    }
}

/// Orchestrates the credential verifier, token issuer and session store.
///
/// Generic over the two storage seams so the same controller runs against
/// the in-memory adapters in tests and Postgres in production.
pub struct SessionLifecycle<U, S> {
    credentials: CredentialVerifier<U>,
    issuer: TokenIssuer,
    sessions: S,
    clock: Arc<dyn Clock>,
}

impl<U, S> SessionLifecycle<U, S>
where
    U: UserDirectory,
    S: SessionStore,
{
    pub fn new(
        directory: U,
        sessions: S,
        config: &AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(config.hashing)?;
        Ok(Self {
            credentials: CredentialVerifier::new(directory, hasher)?,
            issuer: TokenIssuer::new(&config.signing_secret, config.ttl, clock.clone()),
            sessions,
            clock,
        })
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    pub fn directory(&self) -> &U {
        self.credentials.directory()
    }

    /// Verify credentials and open a session, replacing any prior one.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        let user = match self.credentials.verify(email, password).await {
            Ok(user) => user,
            Err(err) => {
                match &err {
                    AuthError::Storage(_) | AuthError::Internal(_) => audit_failure("login", &err),
                    _ => warn!(email = %normalize_email(email), reason = %err, "login failed"),
                }
                return Err(err);
            }
        };

        let session = self.open_session(user, client).await?;
        info!(user_id = %session.user.id, outcome = "ok", "login succeeded");
        Ok(session)
    }

    /// Create an account and open its first session.
    pub async fn register(
        &self,
        registration: Registration,
        client: ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        let (email, role) = registration.validate()?;
        let password_hash = self.credentials.hash_password(&registration.password).await?;

        let new_user = NewUser {
            email,
            display_name: registration.display_name.trim().to_string(),
            password_hash,
            role,
        };
        let created = match self.directory().create(new_user, self.clock.now()).await {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => {
                info!(outcome = "email_taken", "registration rejected");
                return Err(AuthError::EmailTaken);
            }
            Err(err) => {
                let err = AuthError::from(err);
                audit_failure("register", &err);
                return Err(err);
            }
        };

        let session = self.open_session(created.summary(), client).await?;
        info!(user_id = %session.user.id, role = %session.user.role, "user registered");
        Ok(session)
    }

    /// Exchange a refresh token for a new pair, invalidating the presented one.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        match self.rotate(refresh_token, client).await {
            Ok(session) => {
                info!(user_id = %session.user.id, outcome = "ok", "refresh succeeded");
                Ok(session)
            }
            Err(err) => {
                audit_failure("refresh", &err);
                Err(err)
            }
        }
    }

    /// Revoke the session holding `refresh_token`. Unknown tokens are not an error.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let record = self.sessions.find_by_token(refresh_token).await?;
        self.sessions
            .delete_by_token(refresh_token)
            .await
            .inspect_err(|e| error!(error = %e, "logout failed"))?;
        match record {
            Some(r) => info!(user_id = %r.user_id, "logged out"),
            None => info!("logout for unknown session"),
        }
        Ok(())
    }

    /// Revoke every session of a user, returning how many were removed.
    pub async fn logout_all(&self, user_id: UserId) -> Result<u64, AuthError> {
        let removed = self
            .sessions
            .delete_all_for_user(user_id)
            .await
            .inspect_err(|e| error!(error = %e, user_id = %user_id, "logout-all failed"))?;
        info!(user_id = %user_id, removed, "logged out everywhere");
        Ok(removed)
    }

    /// Stateless access-token check. No store lookup.
    pub fn authenticate(&self, access_token: &str) -> Result<Principal, AuthError> {
        self.issuer.verify_access(access_token).map(Principal::from)
    }

    async fn open_session(
        &self,
        user: UserSummary,
        client: ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        let tokens = self.issuer.issue(&user.identity())?;
        let record = RefreshTokenRecord::new(
            user.id,
            tokens.refresh_token.clone(),
            client,
            tokens.issued_at,
            tokens.refresh_expires_at,
        );
        self.sessions.put(record).await.inspect_err(|e| {
            error!(error = %e, user_id = %user.id, "failed to persist session");
        })?;
        Ok(AuthSession { tokens, user })
    }

    async fn rotate(
        &self,
        refresh_token: &str,
        client: ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        let record = self
            .sessions
            .find_by_token(refresh_token)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if record.is_expired(self.clock.now()) {
            self.sessions.delete_by_token(refresh_token).await?;
            return Err(AuthError::ExpiredRefreshToken);
        }

        let claims = match self.issuer.verify_refresh(refresh_token) {
            Ok(claims) => claims,
            Err(AuthError::ExpiredRefreshToken) => {
                self.sessions.delete_by_token(refresh_token).await?;
                return Err(AuthError::ExpiredRefreshToken);
            }
            Err(err) => return Err(err),
        };
        if claims.sub != record.user_id {
            return Err(AuthError::TamperedToken);
        }

        let user = match self.directory().find_by_id(record.user_id).await? {
            Some(user) if user.is_active() => user,
            _ => {
                self.sessions.delete_by_token(refresh_token).await?;
                return Err(AuthError::UserNotFound);
            }
        };

        let client = if client == ClientMeta::default() {
            record.client
        } else {
            client
        };
        let tokens = self.issuer.issue(&user.identity())?;
        let replacement = RefreshTokenRecord::new(
            user.id,
            tokens.refresh_token.clone(),
            client,
            tokens.issued_at,
            tokens.refresh_expires_at,
        );

        if !self.sessions.rotate(refresh_token, replacement).await? {
            return Err(AuthError::InvalidRefreshToken);
        }
        Ok(AuthSession {
            tokens,
            user: user.summary(),
        })
    }
}

/// Storage failures get full detail at `error`; everything else is an audit line.
fn audit_failure(operation: &'static str, err: &AuthError) {
    match err {
        AuthError::Storage(_) | AuthError::Internal(_) => {
            error!(operation, error = %err, "session operation failed");
        }
        _ => warn!(operation, reason = %err, "session operation rejected"),
    }
}
