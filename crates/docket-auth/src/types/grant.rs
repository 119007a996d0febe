//! Token grant (one issued access/refresh pair) and token hashing.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use super::scope::ScopeSet;

/// One issued access/refresh token pair.
///
/// Only SHA-256 hashes of the token values are stored. The plaintext tokens
/// exist solely in the token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    /// Grant identifier, exposed by the authorizations API.
    pub id: Uuid,

    /// Owner of the grant.
    pub user_id: String,

    /// Client the grant was issued to.
    pub client_id: String,

    /// Sanitized device label chosen at consent time.
    pub device_name: String,

    /// Hex SHA-256 of the current access token.
    pub access_token_hash: String,

    /// Hex SHA-256 of the current refresh token.
    pub refresh_token_hash: String,

    /// Granted scopes.
    pub scopes: ScopeSet,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Refresh token expiry. Moves forward on every rotation.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl TokenGrant {
    /// Returns `true` if the refresh token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Compare-and-swap rotation of a grant's token hashes.
///
/// Applies only while the stored refresh hash still equals
/// `expected_refresh_hash`.
#[derive(Debug, Clone)]
pub struct GrantRotation {
    pub id: Uuid,
    pub expected_refresh_hash: String,
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    pub expires_at: OffsetDateTime,
}

/// An authenticated user session, owned by the login subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: String,
}

/// Generates a 256-bit random value, base64url encoded without padding.
///
/// Used for authorization codes, access tokens and refresh tokens.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex SHA-256 of a token value, the form in which tokens are stored.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_is_256_bits() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert_eq!(URL_SAFE_NO_PAD.decode(&token).unwrap().len(), 32);
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_hash_token_is_hex_sha256() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let now = OffsetDateTime::now_utc();
        let grant = TokenGrant {
            id: Uuid::new_v4(),
            user_id: "user-1".into(),
            client_id: "client".into(),
            device_name: "Laptop".into(),
            access_token_hash: hash_token("a"),
            refresh_token_hash: hash_token("r"),
            scopes: ScopeSet::filter("docs:read"),
            created_at: now,
            expires_at: now,
        };
        assert!(grant.is_expired_at(now));
        assert!(!grant.is_expired_at(now - time::Duration::seconds(1)));
    }
}
