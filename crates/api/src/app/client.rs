//! Best-effort client metadata extractor.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{AsHeaderName, USER_AGENT};
use axum::http::{HeaderMap, request::Parts};

use learnhub_auth::ClientMeta;

const MAX_LEN: usize = 512;

/// `User-Agent` plus source IP (first `X-Forwarded-For` hop, else the peer address).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo(pub ClientMeta);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(ClientInfo(client_meta(&parts.headers, peer)))
    }
}

fn client_meta(headers: &HeaderMap, peer: Option<String>) -> ClientMeta {
    let user_agent = header_str(headers, USER_AGENT).map(truncate);
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(truncate);

    ClientMeta::new(user_agent, forwarded.or(peer))
}

fn header_str<K: AsHeaderName>(headers: &HeaderMap, name: K) -> Option<&str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn truncate(value: &str) -> String {
    value.chars().take(MAX_LEN).collect()
}
