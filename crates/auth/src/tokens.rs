//! Token issuance and verification (HS256 JWTs).
//!
//! The issuer is a pure function of its inputs, the signing secret and the
//! injected clock. Expiry is checked against that clock rather than the
//! system time `jsonwebtoken` would otherwise use.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use learnhub_core::Clock;

use crate::claims::{AccessClaims, RefreshClaims, TokenValidationError, validate_claims};
use crate::{AuthError, UserIdentity};

/// Shared HMAC secret. Immutable for the process lifetime; `Debug` is redacted.
#[derive(Clone)]
pub struct SigningSecret(Arc<[u8]>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Lifetimes of the two token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtl {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            refresh: Duration::days(30),
        }
    }
}

/// A freshly minted access/refresh pair.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedTokens {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
}

impl core::fmt::Debug for IssuedTokens {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IssuedTokens")
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

/// Mints and verifies signed tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TokenTtl,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(secret: &SigningSecret, ttl: TokenTtl, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks are done against the injected clock in `validate_claims`.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
            clock,
        }
    }

    /// Mint an access token `{sub, email, role}` and a refresh token `{sub}`.
    pub fn issue(&self, identity: &UserIdentity) -> Result<IssuedTokens, AuthError> {
        // JWT timestamps are whole seconds; keep the returned expiries identical.
        let now = self.clock.now().trunc_subsecs(0);
        let access_expires_at = expiry(now, self.ttl.access)?;
        let refresh_expires_at = expiry(now, self.ttl.refresh)?;

        let access = AccessClaims {
            sub: identity.user_id,
            email: identity.email.clone(),
            role: identity.role,
            iat: now,
            exp: access_expires_at,
        };
        let refresh = RefreshClaims {
            sub: identity.user_id,
            jti: Uuid::new_v4(),
            iat: now,
            exp: refresh_expires_at,
        };

        Ok(IssuedTokens {
            access_token: self.sign(&access)?,
            access_expires_at,
            refresh_token: self.sign(&refresh)?,
            refresh_expires_at,
            issued_at: now,
        })
    }

    /// Stateless access-token check used on every authenticated request.
    ///
    /// Any failure (signature, shape, expiry) is [`AuthError::InvalidToken`].
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let claims: AccessClaims = jsonwebtoken::decode(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?
            .claims;
        validate_claims(claims.iat, claims.exp, self.clock.now())
            .map_err(|_| AuthError::InvalidToken)?;
        Ok(claims)
    }

    /// Verify a refresh token's signature and time window.
    ///
    /// A broken signature or malformed payload is [`AuthError::TamperedToken`];
    /// a past `exp` is [`AuthError::ExpiredRefreshToken`].
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let claims: RefreshClaims = jsonwebtoken::decode(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::TamperedToken)?
            .claims;
        match validate_claims(claims.iat, claims.exp, self.clock.now()) {
            Ok(()) => Ok(claims),
            Err(TokenValidationError::Expired) => Err(AuthError::ExpiredRefreshToken),
            Err(_) => Err(AuthError::TamperedToken),
        }
    }

    fn sign<T: serde::Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, AuthError> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AuthError::Internal(format!("token lifetime {ttl} overflows")))
}

impl core::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
