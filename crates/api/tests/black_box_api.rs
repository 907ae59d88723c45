use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use learnhub_auth::{HashingCost, SigningSecret};
use learnhub_core::ManualClock;
use learnhub_infra::{AuthConfig, StorageBackend};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "black-box-secret";

struct TestServer {
    base_url: String,
    clock: Arc<ManualClock>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let mut config = AuthConfig::with_secret(SigningSecret::new(JWT_SECRET));
        config.hashing = HashingCost::minimal();

        // Same router as prod with in-memory storage, bound to an ephemeral port.
        let services =
            learnhub_api::app::build_services(&config, &StorageBackend::InMemory, clock.clone())
                .await
                .expect("failed to build services");
        let app = learnhub_api::app::build_app(Arc::new(services));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            clock,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get_authed(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn register(&self, email: &str, password: &str) -> Value {
        let (status, body) = self
            .post(
                "/auth/register",
                json!({ "email": email, "password": password, "display_name": "Alice" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn decode_claims(token: &str) -> Value {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims = HashSet::new();
    jsonwebtoken::decode::<Value>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &validation,
    )
    .expect("token should verify with the server secret")
    .claims
}

fn token(body: &Value, field: &str) -> String {
    body[field].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_returns_summary_and_token_pair() {
    let srv = TestServer::spawn().await;
    let body = srv.register("New@Example.com", "correct-horse").await;

    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);
    assert_eq!(body["refresh_expires_in"], 30 * 24 * 3600);
    assert_eq!(body["user"]["email"], "new@example.com");
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(body["user"]["display_name"], "Alice");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
}

#[tokio::test]
async fn register_rejects_duplicates_and_bad_input() {
    let srv = TestServer::spawn().await;
    srv.register("a@x.com", "correct-horse").await;

    let (status, body) = srv
        .post(
            "/auth/register",
            json!({ "email": "A@x.com", "password": "another-one", "display_name": "B" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email_taken");

    let (status, body) = srv
        .post(
            "/auth/register",
            json!({ "email": "b@x.com", "password": "short", "display_name": "B" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = srv
        .post(
            "/auth/register",
            json!({
                "email": "c@x.com",
                "password": "correct-horse",
                "display_name": "C",
                "role": "admin"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = srv
        .post("/auth/register", json!({ "email": "d@x.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn login_issues_tokens_with_exact_identity_claims() {
    let srv = TestServer::spawn().await;
    let reg = srv.register("a@x.com", "correct-horse").await;
    let user_id = reg["user"]["id"].as_str().unwrap().to_string();

    let (status, body) = srv
        .post(
            "/auth/login",
            json!({ "email": "a@x.com", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let claims = decode_claims(&token(&body, "access_token"));
    let mut keys: Vec<_> = claims.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["email", "exp", "iat", "role", "sub"]);
    assert_eq!(claims["sub"], user_id.as_str());
    assert_eq!(claims["email"], "a@x.com");
    assert_eq!(claims["role"], "student");

    let refresh_claims = decode_claims(&token(&body, "refresh_token"));
    assert_eq!(refresh_claims["sub"], user_id.as_str());
    assert!(refresh_claims.get("email").is_none());
    assert!(refresh_claims.get("role").is_none());

    // The registration session was replaced by the login session.
    let (status, _) = srv
        .post(
            "/auth/refresh",
            json!({ "refresh_token": token(&reg, "refresh_token") }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_failures_are_identical() {
    let srv = TestServer::spawn().await;
    srv.register("a@x.com", "correct-horse").await;

    let wrong_password = srv
        .post(
            "/auth/login",
            json!({ "email": "a@x.com", "password": "wrong-horse" }),
        )
        .await;
    let unknown_email = srv
        .post(
            "/auth/login",
            json!({ "email": "nobody@x.com", "password": "correct-horse" }),
        )
        .await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.1["error"], "invalid_credentials");
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn profile_requires_valid_bearer_token() {
    let srv = TestServer::spawn().await;
    let reg = srv.register("a@x.com", "correct-horse").await;
    let access = token(&reg, "access_token");

    let res = srv
        .client
        .get(format!("{}/auth/profile", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let (status, body) = srv.get_authed("/auth/profile", &access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["role"], "student");
    assert_eq!(body["user_id"], reg["user"]["id"]);

    let (head, sig) = access.rsplit_once('.').unwrap();
    let flipped = if sig.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{head}.{flipped}{}", &sig[1..]);
    let (status, _) = srv.get_authed("/auth/profile", &tampered).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A refresh token is not an access token.
    let (status, _) = srv
        .get_authed("/auth/profile", &token(&reg, "refresh_token"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_and_rejects_replay() {
    let srv = TestServer::spawn().await;
    let reg = srv.register("a@x.com", "correct-horse").await;
    let first = token(&reg, "refresh_token");

    // camelCase body is accepted too.
    let (status, rotated) = srv
        .post("/auth/refresh", json!({ "refreshToken": first }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = token(&rotated, "refresh_token");
    assert_ne!(first, second);
    assert_eq!(rotated["user"]["email"], "a@x.com");

    let (status, body) = srv
        .post("/auth/refresh", json!({ "refresh_token": first }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_session");
    assert_eq!(body["message"], "invalid or expired session");

    let (status, _) = srv
        .post("/auth/refresh", json!({ "refresh_token": second }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_and_expired_refresh_tokens_look_the_same() {
    let srv = TestServer::spawn().await;
    let reg = srv.register("a@x.com", "correct-horse").await;

    let unknown = srv
        .post("/auth/refresh", json!({ "refresh_token": "never-issued" }))
        .await;

    srv.clock.advance(ChronoDuration::days(31));
    let expired = srv
        .post(
            "/auth/refresh",
            json!({ "refresh_token": token(&reg, "refresh_token") }),
        )
        .await;

    assert_eq!(unknown.0, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, expired);

    // The access token died long before.
    let (status, _) = srv
        .get_authed("/auth/profile", &token(&reg, "access_token"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_is_idempotent_and_revokes() {
    let srv = TestServer::spawn().await;
    let reg = srv.register("a@x.com", "correct-horse").await;
    let refresh = token(&reg, "refresh_token");

    for _ in 0..2 {
        let (status, body) = srv
            .post("/auth/logout", json!({ "refresh_token": refresh }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "logged out");
    }
    let (status, _) = srv
        .post("/auth/logout", json!({ "refresh_token": "never-issued" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv
        .post("/auth/refresh", json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_all_requires_auth_and_revokes_session() {
    let srv = TestServer::spawn().await;
    let reg = srv.register("a@x.com", "correct-horse").await;

    let (status, _) = srv.post("/auth/logout-all", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .post(format!("{}/auth/logout-all", srv.base_url))
        .bearer_auth(token(&reg, "access_token"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["revoked_sessions"], 1);

    let (status, _) = srv
        .post(
            "/auth/refresh",
            json!({ "refresh_token": token(&reg, "refresh_token") }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .post(format!("{}/auth/login", srv.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}
