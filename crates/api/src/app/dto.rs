use serde::{Deserialize, Serialize};

use learnhub_auth::{Role, UserSummary};
use learnhub_infra::{AuthSession, Registration};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(alias = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl From<RegisterRequest> for Registration {
    fn from(body: RegisterRequest) -> Self {
        Registration {
            email: body.email,
            password: body.password,
            display_name: body.display_name,
            role: body.role,
        }
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `/auth/refresh` and `/auth/logout`.
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(alias = "refreshToken")]
    pub refresh_token: String,
}

// -------------------------
// Response DTOs
// -------------------------

/// Token pair plus the sanitized account. Not `Debug`: it carries live tokens.
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
    pub refresh_expires_in: i64,
    pub user: UserSummary,
}

impl From<AuthSession> for TokenResponse {
    fn from(session: AuthSession) -> Self {
        let tokens = session.tokens;
        TokenResponse {
            expires_in: (tokens.access_expires_at - tokens.issued_at).num_seconds(),
            refresh_expires_in: (tokens.refresh_expires_at - tokens.issued_at).num_seconds(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer",
            user: session.user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    pub message: &'static str,
    pub revoked_sessions: u64,
}
