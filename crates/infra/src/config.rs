//! Environment-driven configuration.
//!
//! Every loader has a `from_lookup` twin taking a key -> value function so
//! tests can supply values without touching the process environment.

use std::time::Duration as StdDuration;

use chrono::Duration;
use thiserror::Error;

use learnhub_auth::{HashingCost, SigningSecret, TokenTtl};

/// Upper bound for either token lifetime (ten years).
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Session-core settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub signing_secret: SigningSecret,
    pub ttl: TokenTtl,
    pub hashing: HashingCost,
    /// `None` disables the background sweep of expired sessions.
    pub sweep_interval: Option<StdDuration>,
}

impl AuthConfig {
    /// Defaults for everything except the secret.
    pub fn with_secret(signing_secret: SigningSecret) -> Self {
        Self {
            signing_secret,
            ttl: TokenTtl::default(),
            hashing: HashingCost::default(),
            sweep_interval: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let defaults_ttl = TokenTtl::default();
        let access_secs = parse_or(
            &lookup,
            "ACCESS_TOKEN_TTL_SECS",
            defaults_ttl.access.num_seconds(),
        )?;
        let refresh_secs = parse_or(
            &lookup,
            "REFRESH_TOKEN_TTL_SECS",
            defaults_ttl.refresh.num_seconds(),
        )?;
        if access_secs <= 0 {
            return Err(invalid("ACCESS_TOKEN_TTL_SECS", "must be positive"));
        }
        let access = ttl_seconds("ACCESS_TOKEN_TTL_SECS", access_secs)?;
        let refresh = ttl_seconds("REFRESH_TOKEN_TTL_SECS", refresh_secs)?;
        if refresh_secs <= access_secs {
            return Err(invalid(
                "REFRESH_TOKEN_TTL_SECS",
                "must be longer than the access token lifetime",
            ));
        }

        let default_cost = HashingCost::default();
        let hashing = HashingCost {
            memory_kib: parse_or(&lookup, "ARGON2_MEMORY_KIB", default_cost.memory_kib)?,
            iterations: parse_or(&lookup, "ARGON2_ITERATIONS", default_cost.iterations)?,
        };

        let sweep_secs: u64 = parse_or(&lookup, "SESSION_SWEEP_INTERVAL_SECS", 0)?;

        Ok(Self {
            signing_secret: SigningSecret::new(secret),
            ttl: TokenTtl { access, refresh },
            hashing,
            sweep_interval: (sweep_secs > 0).then(|| StdDuration::from_secs(sweep_secs)),
        })
    }
}

/// Where accounts and sessions live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    Postgres { database_url: String },
}

/// Settings of the HTTP binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub storage: StorageBackend,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let persistent: bool = parse_or(&lookup, "USE_PERSISTENT_STORES", false)?;

        let storage = if persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|s| !s.is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            StorageBackend::Postgres { database_url }
        } else {
            StorageBackend::InMemory
        };

        Ok(Self { bind_addr, storage })
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

fn ttl_seconds(key: &'static str, secs: i64) -> Result<Duration, ConfigError> {
    if secs > MAX_TOKEN_TTL_SECS {
        return Err(invalid(
            key,
            format!("must not exceed {MAX_TOKEN_TTL_SECS} seconds"),
        ));
    }
    Duration::try_seconds(secs).ok_or_else(|| invalid(key, "out of range"))
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, format!("{raw:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = AuthConfig::from_lookup(env(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(cfg.ttl, TokenTtl::default());
        assert_eq!(cfg.hashing, HashingCost::default());
        assert_eq!(cfg.sweep_interval, None);
    }

    #[test]
    fn secret_is_required() {
        assert_eq!(
            AuthConfig::from_lookup(env(&[])).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
        assert_eq!(
            AuthConfig::from_lookup(env(&[("JWT_SECRET", "")])).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = AuthConfig::from_lookup(env(&[
            ("JWT_SECRET", "s3cret"),
            ("ACCESS_TOKEN_TTL_SECS", "60"),
            ("REFRESH_TOKEN_TTL_SECS", "3600"),
            ("ARGON2_MEMORY_KIB", "1024"),
            ("ARGON2_ITERATIONS", "3"),
            ("SESSION_SWEEP_INTERVAL_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(cfg.ttl.access, Duration::seconds(60));
        assert_eq!(cfg.ttl.refresh, Duration::seconds(3600));
        assert_eq!(cfg.hashing.memory_kib, 1024);
        assert_eq!(cfg.hashing.iterations, 3);
        assert_eq!(cfg.sweep_interval, Some(StdDuration::from_secs(30)));
    }

    #[test]
    fn bad_numbers_are_invalid() {
        let err = AuthConfig::from_lookup(env(&[
            ("JWT_SECRET", "s3cret"),
            ("ACCESS_TOKEN_TTL_SECS", "fifteen"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "ACCESS_TOKEN_TTL_SECS",
                ..
            }
        ));
    }

    #[test]
    fn refresh_must_outlive_access() {
        let err = AuthConfig::from_lookup(env(&[
            ("JWT_SECRET", "s3cret"),
            ("ACCESS_TOKEN_TTL_SECS", "600"),
            ("REFRESH_TOKEN_TTL_SECS", "60"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "REFRESH_TOKEN_TTL_SECS",
                ..
            }
        ));
    }

    #[test]
    fn oversized_lifetimes_are_rejected() {
        for secs in ["9223372036854775807", "100000000000000"] {
            let err = AuthConfig::from_lookup(env(&[
                ("JWT_SECRET", "s3cret"),
                ("REFRESH_TOKEN_TTL_SECS", secs),
            ]))
            .unwrap_err();
            assert!(
                matches!(
                    err,
                    ConfigError::Invalid {
                        key: "REFRESH_TOKEN_TTL_SECS",
                        ..
                    }
                ),
                "{secs}: {err:?}"
            );
        }

        let ceiling = MAX_TOKEN_TTL_SECS.to_string();
        let cfg = AuthConfig::from_lookup(env(&[
            ("JWT_SECRET", "s3cret"),
            ("REFRESH_TOKEN_TTL_SECS", ceiling.as_str()),
        ]))
        .unwrap();
        assert_eq!(cfg.ttl.refresh, Duration::seconds(MAX_TOKEN_TTL_SECS));
    }

    #[test]
    fn server_defaults_to_in_memory() {
        let cfg = ServerConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.storage, StorageBackend::InMemory);
    }

    #[test]
    fn persistent_storage_needs_database_url() {
        assert_eq!(
            ServerConfig::from_lookup(env(&[("USE_PERSISTENT_STORES", "true")])).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        let cfg = ServerConfig::from_lookup(env(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/learnhub"),
        ]))
        .unwrap();
        assert_eq!(
            cfg.storage,
            StorageBackend::Postgres {
                database_url: "postgres://localhost/learnhub".to_string()
            }
        );
    }
}
