use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use learnhub_auth::AuthError;

/// Map an [`AuthError`] to a fixed, minimal client-facing body.
///
/// Session failures share one message so callers cannot tell a revoked token
/// from an expired, forged or orphaned one.
pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid credentials",
        ),
        AuthError::InvalidRefreshToken
        | AuthError::ExpiredRefreshToken
        | AuthError::TamperedToken
        | AuthError::UserNotFound => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_session",
            "invalid or expired session",
        ),
        AuthError::InvalidToken => json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid access token",
        ),
        AuthError::AccountDisabled => json_error(
            StatusCode::FORBIDDEN,
            "account_disabled",
            "account is disabled",
        ),
        AuthError::EmailTaken => json_error(
            StatusCode::CONFLICT,
            "email_taken",
            "email is already registered",
        ),
        AuthError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AuthError::Storage(detail) | AuthError::Internal(detail) => {
            error!(detail = %detail, "request failed with internal error");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal server error",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
