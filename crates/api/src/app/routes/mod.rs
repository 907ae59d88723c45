use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod system;

/// Unauthenticated `/auth` endpoints.
pub fn public_router() -> Router {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
}

/// `/auth` endpoints behind the bearer guard.
pub fn protected_router() -> Router {
    Router::new()
        .route("/profile", get(auth::profile))
        .route("/logout-all", post(auth::logout_all))
}
