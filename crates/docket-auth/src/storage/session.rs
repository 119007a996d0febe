//! User session lookup.
//!
//! Sessions are created by the login subsystem. The authorization server
//! only resolves a session cookie value to a user.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::UserSession;

/// Read-only view of the login subsystem's sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolves a session ID. Returns `None` for unknown or expired sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get(&self, session_id: &str) -> AuthResult<Option<UserSession>>;
}
