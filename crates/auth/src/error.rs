use thiserror::Error;

/// Failure reported by a storage adapter (session store or user directory).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other backend failure (connection, query, lock poisoning).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Authentication/session failure taxonomy.
///
/// The `Display` strings are for server-side logs. Client-facing messages are
/// chosen by the transport layer and collapse several of these
/// variants into one generic answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password. Both cases are indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Credentials were correct but the account is suspended.
    #[error("account is disabled")]
    AccountDisabled,

    /// Access token is missing, malformed, badly signed or expired.
    #[error("invalid access token")]
    InvalidToken,

    /// Refresh token has no live record (never issued, rotated away or revoked).
    #[error("invalid refresh token")]
    InvalidRefreshToken,

    /// Refresh token record exists but is past its expiry.
    #[error("refresh token expired")]
    ExpiredRefreshToken,

    /// Refresh token record exists but the token's signature or payload does not verify.
    #[error("refresh token failed signature verification")]
    TamperedToken,

    /// The token subject no longer resolves to an active user.
    #[error("token subject not found")]
    UserNotFound,

    #[error("email already registered")]
    EmailTaken,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// True for every variant that means "this refresh session is not usable".
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidRefreshToken
                | AuthError::ExpiredRefreshToken
                | AuthError::TamperedToken
                | AuthError::UserNotFound
        )
    }
}

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        AuthError::Storage(value.to_string())
    }
}

impl From<learnhub_core::DomainError> for AuthError {
    fn from(value: learnhub_core::DomainError) -> Self {
        use learnhub_core::DomainError;
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                AuthError::Validation(msg)
            }
        }
    }
}
