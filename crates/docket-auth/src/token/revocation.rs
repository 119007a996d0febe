//! Token revocation (RFC 7009).
//!
//! Revocation deletes the whole grant, so revoking either the access token
//! or the refresh token kills both. Unknown tokens are not an error.

use std::sync::Arc;

use crate::storage::TokenGrantStorage;
use crate::types::hash_token;

/// Optional hint about the type of token being revoked.
///
/// Accepted for RFC 7009 compatibility. Both hashes are always checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTypeHint {
    AccessToken,
    RefreshToken,
}

impl TokenTypeHint {
    /// Parses a hint; unknown values are ignored.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "access_token" => Some(Self::AccessToken),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

/// Revokes token grants.
pub struct RevocationService {
    grants: Arc<dyn TokenGrantStorage>,
}

impl RevocationService {
    #[must_use]
    pub fn new(grants: Arc<dyn TokenGrantStorage>) -> Self {
        Self { grants }
    }

    /// Revokes the grant holding `token`.
    ///
    /// Infallible from the caller's point of view: unknown tokens and
    /// storage failures are logged, never reported.
    pub async fn revoke(&self, token: &str, hint: Option<TokenTypeHint>) {
        match self.grants.delete_by_token_hash(&hash_token(token)).await {
            Ok(0) => tracing::debug!(?hint, "Revocation for unknown token ignored"),
            Ok(count) => tracing::info!(count, ?hint, "Token grant revoked"),
            Err(e) => tracing::warn!(error = %e, "Token revocation failed in storage"),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::AuthResult;
    use crate::error::AuthError;
    use crate::storage::MemoryStorage;
    use crate::types::{GrantRotation, ScopeSet, TokenGrant};

    fn grant(access: &str, refresh: &str) -> TokenGrant {
        let now = time::OffsetDateTime::now_utc();
        TokenGrant {
            id: Uuid::new_v4(),
            user_id: "user-1".into(),
            client_id: "client-1".into(),
            device_name: "Laptop".into(),
            access_token_hash: hash_token(access),
            refresh_token_hash: hash_token(refresh),
            scopes: ScopeSet::filter("docs:read"),
            created_at: now,
            expires_at: now + time::Duration::days(30),
        }
    }

    #[tokio::test]
    async fn test_revoke_by_access_token() {
        let storage = Arc::new(MemoryStorage::new());
        storage.create(&grant("a1", "r1")).await.unwrap();
        let service = RevocationService::new(storage.clone());

        service.revoke("a1", Some(TokenTypeHint::AccessToken)).await;
        assert_eq!(storage.grant_count(), 0);
    }

    #[tokio::test]
    async fn test_revoke_by_refresh_token_ignores_wrong_hint() {
        let storage = Arc::new(MemoryStorage::new());
        storage.create(&grant("a1", "r1")).await.unwrap();
        let service = RevocationService::new(storage.clone());

        service.revoke("r1", Some(TokenTypeHint::AccessToken)).await;
        assert_eq!(storage.grant_count(), 0);
    }

    #[tokio::test]
    async fn test_revoke_unknown_token_is_noop() {
        let storage = Arc::new(MemoryStorage::new());
        storage.create(&grant("a1", "r1")).await.unwrap();
        let service = RevocationService::new(storage.clone());

        service.revoke("does-not-exist", None).await;
        assert_eq!(storage.grant_count(), 1);
    }

    struct FailingGrants;

    #[async_trait]
    impl TokenGrantStorage for FailingGrants {
        async fn create(&self, _: &TokenGrant) -> AuthResult<()> {
            Err(AuthError::storage("down"))
        }
        async fn find_by_refresh_hash(&self, _: &str) -> AuthResult<Option<TokenGrant>> {
            Err(AuthError::storage("down"))
        }
        async fn rotate(&self, _: &GrantRotation) -> AuthResult<Option<TokenGrant>> {
            Err(AuthError::storage("down"))
        }
        async fn delete(&self, _: Uuid) -> AuthResult<bool> {
            Err(AuthError::storage("down"))
        }
        async fn delete_by_token_hash(&self, _: &str) -> AuthResult<u64> {
            Err(AuthError::storage("down"))
        }
        async fn list_by_user(&self, _: &str) -> AuthResult<Vec<TokenGrant>> {
            Err(AuthError::storage("down"))
        }
        async fn delete_for_user(&self, _: Uuid, _: &str) -> AuthResult<bool> {
            Err(AuthError::storage("down"))
        }
        async fn cleanup_expired(&self) -> AuthResult<u64> {
            Err(AuthError::storage("down"))
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_swallowed() {
        let service = RevocationService::new(Arc::new(FailingGrants));
        service.revoke("anything", None).await;
    }

    #[test]
    fn test_hint_parsing() {
        assert_eq!(TokenTypeHint::parse("refresh_token"), Some(TokenTypeHint::RefreshToken));
        assert_eq!(TokenTypeHint::parse("id_token"), None);
    }
}
