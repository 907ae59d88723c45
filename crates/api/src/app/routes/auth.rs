use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::client::ClientInfo;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

/// Unwrap a JSON body or answer with the uniform `validation_error` shape.
macro_rules! json_body {
    ($body:expr) => {
        match $body {
            Ok(Json(body)) => body,
            Err(rejection) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    rejection.body_text(),
                );
            }
        }
    };
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    ClientInfo(client): ClientInfo,
    body: Result<Json<dto::RegisterRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = json_body!(body);
    match services.lifecycle.register(body.into(), client).await {
        Ok(session) => (
            StatusCode::CREATED,
            Json(dto::TokenResponse::from(session)),
        )
            .into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ClientInfo(client): ClientInfo,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = json_body!(body);
    match services
        .lifecycle
        .login(&body.email, &body.password, client)
        .await
    {
        Ok(session) => (StatusCode::OK, Json(dto::TokenResponse::from(session))).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    ClientInfo(client): ClientInfo,
    body: Result<Json<dto::RefreshTokenRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = json_body!(body);
    match services.lifecycle.refresh(&body.refresh_token, client).await {
        Ok(session) => (StatusCode::OK, Json(dto::TokenResponse::from(session))).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::RefreshTokenRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = json_body!(body);
    match services.lifecycle.logout(&body.refresh_token).await {
        Ok(()) => (
            StatusCode::OK,
            Json(dto::MessageResponse {
                message: "logged out",
            }),
        )
            .into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn logout_all(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.lifecycle.logout_all(principal.user_id()).await {
        Ok(revoked_sessions) => (
            StatusCode::OK,
            Json(dto::LogoutAllResponse {
                message: "logged out everywhere",
                revoked_sessions,
            }),
        )
            .into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn profile(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": principal.user_id().to_string(),
        "email": principal.email(),
        "role": principal.role().as_str(),
    }))
}
