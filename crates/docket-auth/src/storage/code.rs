//! Authorization code storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::AuthorizationCode;

/// Storage for single-use authorization codes.
#[async_trait]
pub trait AuthorizationCodeStorage: Send + Sync {
    /// Stores a newly issued code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Atomically removes and returns the code.
    ///
    /// When several callers race on the same code, exactly one receives
    /// `Some`. Expired codes are still returned so the caller can report
    /// them; they are removed either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn take(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Deletes expired codes, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
