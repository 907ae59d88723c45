use serde::{Deserialize, Serialize};

use learnhub_core::UserId;

use crate::{AccessClaims, Role};

/// Verified identity extracted from a valid access token.
///
/// Downstream authorization receives this and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

impl From<AccessClaims> for Principal {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}
