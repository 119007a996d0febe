//! OAuth client storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::OAuthClient;

/// Storage for registered OAuth clients.
///
/// Clients are immutable once created, so there is no update operation.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Finds a client by its client ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<OAuthClient>>;

    /// Persists a newly registered client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be stored (duplicate ID,
    /// storage unavailable).
    async fn create(&self, client: &OAuthClient) -> AuthResult<()>;
}
