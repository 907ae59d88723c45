//! Password hashing with Argon2id.
//!
//! Hashes are stored in PHC string format, so verification reads the cost
//! parameters from the hash itself and keeps working after a cost change.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::AuthError;

/// Argon2id cost knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingCost {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
        }
    }
}

impl HashingCost {
    /// Cheapest legal parameters. Only for tests.
    pub fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
        }
    }
}

/// Salted password hasher. Cloneable so it can be moved onto a blocking worker.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(cost: HashingCost) -> Result<Self, AuthError> {
        let params = Params::new(cost.memory_kib, cost.iterations, 1, None)
            .map_err(|e| AuthError::Internal(format!("invalid argon2 params: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
    }

    /// Check a plaintext password against a stored PHC hash.
    ///
    /// Returns `false` for a mismatch and for an unparseable hash alike.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(HashingCost::minimal()).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let h = hasher();
        let hash = h.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(h.verify("correct horse", &hash));
        assert!(!h.verify("wrong horse", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let h = hasher();
        assert_ne!(h.hash("pw").unwrap(), h.hash("pw").unwrap());
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!hasher().verify("pw", "not-a-phc-string"));
        assert!(!hasher().verify("pw", ""));
    }

    #[test]
    fn verification_reads_cost_from_hash() {
        let cheap = hasher();
        let other = PasswordHasher::new(HashingCost {
            memory_kib: 64,
            iterations: 2,
        })
        .unwrap();
        let hash = other.hash("pw").unwrap();
        assert!(cheap.verify("pw", &hash));
    }

    #[test]
    fn rejects_illegal_cost() {
        assert!(
            PasswordHasher::new(HashingCost {
                memory_kib: 0,
                iterations: 0
            })
            .is_err()
        );
    }
}
