//! In-memory storage backend.
//!
//! Backs every storage trait with [`DashMap`]s. Single-use and
//! compare-and-swap guarantees come from DashMap's per-shard locking:
//! `remove` hands an entry to exactly one caller, and a `get_mut` guard
//! holds the shard lock across the hash check and the update.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use docket_auth::storage::{AuthStores, MemoryStorage};
//!
//! let storage = Arc::new(MemoryStorage::new());
//! storage.insert_session("session-1", "user-1");
//! let stores = AuthStores::memory(storage);
//! ```

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::{AuthorizationCodeStorage, ClientStorage, SessionStore, TokenGrantStorage};
use crate::types::{AuthorizationCode, GrantRotation, OAuthClient, TokenGrant, UserSession};

/// In-process storage for clients, codes, grants and sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    clients: DashMap<String, OAuthClient>,
    codes: DashMap<String, AuthorizationCode>,
    grants: DashMap<Uuid, TokenGrant>,
    sessions: DashMap<String, UserSession>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a login session. The login subsystem owns sessions; this
    /// exists for development setups and tests.
    pub fn insert_session(&self, session_id: impl Into<String>, user_id: impl Into<String>) {
        self.sessions.insert(
            session_id.into(),
            UserSession {
                user_id: user_id.into(),
            },
        );
    }

    /// Drops a login session.
    pub fn remove_session(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Number of stored grants.
    #[must_use]
    pub fn grant_count(&self) -> usize {
        self.grants.len()
    }
}

#[async_trait]
impl ClientStorage for MemoryStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<OAuthClient>> {
        Ok(self.clients.get(client_id).map(|c| c.value().clone()))
    }

    async fn create(&self, client: &OAuthClient) -> AuthResult<()> {
        match self.clients.entry(client.client_id.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage(format!(
                "Client {} already exists",
                client.client_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(client.clone());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl AuthorizationCodeStorage for MemoryStorage {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn take(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self.codes.remove(code).map(|(_, record)| record))
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let before = self.codes.len();
        self.codes.retain(|_, code| !code.is_expired_at(now));
        Ok(before.saturating_sub(self.codes.len()) as u64)
    }
}

#[async_trait]
impl TokenGrantStorage for MemoryStorage {
    async fn create(&self, grant: &TokenGrant) -> AuthResult<()> {
        self.grants.insert(grant.id, grant.clone());
        Ok(())
    }

    async fn find_by_refresh_hash(
        &self,
        refresh_token_hash: &str,
    ) -> AuthResult<Option<TokenGrant>> {
        Ok(self
            .grants
            .iter()
            .find(|g| g.refresh_token_hash == refresh_token_hash)
            .map(|g| g.value().clone()))
    }

    async fn rotate(&self, rotation: &GrantRotation) -> AuthResult<Option<TokenGrant>> {
        let Some(mut grant) = self.grants.get_mut(&rotation.id) else {
            return Ok(None);
        };
        if grant.refresh_token_hash != rotation.expected_refresh_hash {
            return Ok(None);
        }
        grant.access_token_hash = rotation.access_token_hash.clone();
        grant.refresh_token_hash = rotation.refresh_token_hash.clone();
        grant.expires_at = rotation.expires_at;
        Ok(Some(grant.clone()))
    }

    async fn delete(&self, id: Uuid) -> AuthResult<bool> {
        Ok(self.grants.remove(&id).is_some())
    }

    async fn delete_by_token_hash(&self, token_hash: &str) -> AuthResult<u64> {
        let ids: Vec<Uuid> = self
            .grants
            .iter()
            .filter(|g| g.access_token_hash == token_hash || g.refresh_token_hash == token_hash)
            .map(|g| g.id)
            .collect();

        let mut deleted = 0;
        for id in ids {
            if self.grants.remove(&id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn list_by_user(&self, user_id: &str) -> AuthResult<Vec<TokenGrant>> {
        let mut grants: Vec<TokenGrant> = self
            .grants
            .iter()
            .filter(|g| g.user_id == user_id)
            .map(|g| g.value().clone())
            .collect();
        grants.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(grants)
    }

    async fn delete_for_user(&self, id: Uuid, user_id: &str) -> AuthResult<bool> {
        Ok(self
            .grants
            .remove_if(&id, |_, grant| grant.user_id == user_id)
            .is_some())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let before = self.grants.len();
        self.grants.retain(|_, grant| !grant.is_expired_at(now));
        Ok(before.saturating_sub(self.grants.len()) as u64)
    }
}

#[async_trait]
impl SessionStore for MemoryStorage {
    async fn get(&self, session_id: &str) -> AuthResult<Option<UserSession>> {
        Ok(self.sessions.get(session_id).map(|s| s.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::oauth::pkce::PkceChallengeMethod;
    use crate::types::{ScopeSet, hash_token};

    fn code(value: &str, expires_at: OffsetDateTime) -> AuthorizationCode {
        AuthorizationCode {
            code: value.to_string(),
            user_id: "user-1".into(),
            client_id: "client-1".into(),
            device_name: "Laptop".into(),
            code_challenge: "challenge".into(),
            code_challenge_method: PkceChallengeMethod::S256,
            scopes: ScopeSet::filter("docs:read"),
            redirect_uri: "http://localhost:3000/callback".into(),
            created_at: OffsetDateTime::now_utc(),
            expires_at,
        }
    }

    fn grant(user_id: &str, refresh: &str) -> TokenGrant {
        let now = OffsetDateTime::now_utc();
        TokenGrant {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            client_id: "client-1".into(),
            device_name: "Laptop".into(),
            access_token_hash: hash_token(&format!("access-{refresh}")),
            refresh_token_hash: hash_token(refresh),
            scopes: ScopeSet::filter("docs:read"),
            created_at: now,
            expires_at: now + time::Duration::days(30),
        }
    }

    #[tokio::test]
    async fn test_take_is_single_use() {
        let storage = MemoryStorage::new();
        let future = OffsetDateTime::now_utc() + time::Duration::minutes(10);
        AuthorizationCodeStorage::create(&storage, &code("abc", future))
            .await
            .unwrap();

        assert!(storage.take("abc").await.unwrap().is_some());
        assert!(storage.take("abc").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_take_has_one_winner() {
        let storage = Arc::new(MemoryStorage::new());
        let future = OffsetDateTime::now_utc() + time::Duration::minutes(10);
        AuthorizationCodeStorage::create(storage.as_ref(), &code("race", future))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let storage = storage.clone();
                tokio::spawn(async move { storage.take("race").await.unwrap().is_some() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_rotate_requires_current_refresh_hash() {
        let storage = MemoryStorage::new();
        let original = grant("user-1", "refresh-1");
        TokenGrantStorage::create(&storage, &original).await.unwrap();

        let rotation = GrantRotation {
            id: original.id,
            expected_refresh_hash: hash_token("refresh-1"),
            access_token_hash: hash_token("access-2"),
            refresh_token_hash: hash_token("refresh-2"),
            expires_at: original.expires_at,
        };
        let rotated = storage.rotate(&rotation).await.unwrap().unwrap();
        assert_eq!(rotated.refresh_token_hash, hash_token("refresh-2"));

        // Same expected hash again loses the compare-and-swap.
        assert!(storage.rotate(&rotation).await.unwrap().is_none());
        assert!(
            storage
                .find_by_refresh_hash(&hash_token("refresh-1"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_delete_by_either_token_hash() {
        let storage = MemoryStorage::new();
        let first = grant("user-1", "r1");
        let second = grant("user-1", "r2");
        TokenGrantStorage::create(&storage, &first).await.unwrap();
        TokenGrantStorage::create(&storage, &second).await.unwrap();

        assert_eq!(storage.delete_by_token_hash(&hash_token("r1")).await.unwrap(), 1);
        assert_eq!(
            storage
                .delete_by_token_hash(&hash_token("access-r2"))
                .await
                .unwrap(),
            1
        );
        assert_eq!(storage.delete_by_token_hash(&hash_token("nope")).await.unwrap(), 0);
        assert_eq!(storage.grant_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_for_user_checks_owner() {
        let storage = MemoryStorage::new();
        let owned = grant("alice", "r1");
        TokenGrantStorage::create(&storage, &owned).await.unwrap();

        assert!(!storage.delete_for_user(owned.id, "mallory").await.unwrap());
        assert!(storage.delete_for_user(owned.id, "alice").await.unwrap());
        assert!(!storage.delete_for_user(owned.id, "alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_user_filters_owner() {
        let storage = MemoryStorage::new();
        TokenGrantStorage::create(&storage, &grant("alice", "r1")).await.unwrap();
        TokenGrantStorage::create(&storage, &grant("bob", "r2")).await.unwrap();

        let grants = storage.list_by_user("alice").await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].user_id, "alice");
    }

    #[tokio::test]
    async fn test_cleanup_expired_codes() {
        let storage = MemoryStorage::new();
        let now = OffsetDateTime::now_utc();
        AuthorizationCodeStorage::create(&storage, &code("old", now - time::Duration::seconds(1)))
            .await
            .unwrap();
        AuthorizationCodeStorage::create(&storage, &code("new", now + time::Duration::minutes(5)))
            .await
            .unwrap();

        assert_eq!(AuthorizationCodeStorage::cleanup_expired(&storage).await.unwrap(), 1);
        assert!(storage.take("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sessions() {
        let storage = MemoryStorage::new();
        storage.insert_session("s1", "user-1");
        assert_eq!(storage.get("s1").await.unwrap().unwrap().user_id, "user-1");
        storage.remove_session("s1");
        assert!(storage.get("s1").await.unwrap().is_none());
    }
}
