//! Credential and session-token boundary.
//!
//! No HTTP and no SQL here: persistence is
//! reached only through the [`SessionStore`] and [`UserDirectory`] traits.

pub mod claims;
pub mod credentials;
pub mod error;
pub mod password;
pub mod principal;
pub mod roles;
pub mod session;
pub mod tokens;
pub mod user;

pub use claims::{AccessClaims, RefreshClaims, TokenValidationError, validate_claims};
pub use credentials::CredentialVerifier;
pub use error::{AuthError, StoreError};
pub use password::{HashingCost, PasswordHasher};
pub use principal::Principal;
pub use roles::Role;
pub use session::{ClientMeta, RefreshTokenRecord, SessionStore};
pub use tokens::{IssuedTokens, SigningSecret, TokenIssuer, TokenTtl};
pub use user::{
    NewUser, UserDirectory, UserIdentity, UserRecord, UserStatus, UserSummary, normalize_email,
};
