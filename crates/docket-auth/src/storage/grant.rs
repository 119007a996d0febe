//! Token grant storage trait.
//!
//! # Security Considerations
//!
//! - Tokens are stored as SHA-256 hashes only
//! - Rotation is a compare-and-swap on the previous refresh hash
//! - Revocation deletes the grant, so it is immediate

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{GrantRotation, TokenGrant};

/// Storage for token grants.
#[async_trait]
pub trait TokenGrantStorage: Send + Sync {
    /// Stores a new grant.
    ///
    /// # Errors
    ///
    /// Returns an error if the grant cannot be stored.
    async fn create(&self, grant: &TokenGrant) -> AuthResult<()>;

    /// Finds a grant by the hash of its current refresh token.
    ///
    /// Expired grants are returned too; callers check expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_refresh_hash(&self, refresh_token_hash: &str)
    -> AuthResult<Option<TokenGrant>>;

    /// Replaces the grant's token hashes and expiry if its refresh hash
    /// still equals `rotation.expected_refresh_hash`.
    ///
    /// Returns the updated grant, or `None` if another rotation won or the
    /// grant is gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn rotate(&self, rotation: &GrantRotation) -> AuthResult<Option<TokenGrant>>;

    /// Deletes a grant by ID. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, id: Uuid) -> AuthResult<bool>;

    /// Deletes every grant whose access or refresh hash equals `token_hash`.
    ///
    /// Returns the number of deleted grants.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_by_token_hash(&self, token_hash: &str) -> AuthResult<u64>;

    /// Lists a user's grants, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_by_user(&self, user_id: &str) -> AuthResult<Vec<TokenGrant>>;

    /// Deletes a grant only if it belongs to `user_id`.
    ///
    /// Returns `false` both when the grant does not exist and when it is
    /// owned by someone else.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_for_user(&self, id: Uuid, user_id: &str) -> AuthResult<bool>;

    /// Deletes grants whose refresh token has expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
