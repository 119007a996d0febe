//! PostgreSQL storage backend for Docket Auth
//!
//! Provides persistent storage for:
//!
//! - OAuth clients
//! - Authorization codes (consumed with `DELETE ... RETURNING`)
//! - Token grants (rotated with a compare-and-swap `UPDATE`)
//! - Read access to the login subsystem's `user_sessions` table
//!
//! # Example
//!
//! ```ignore
//! use docket_auth_postgres::PostgresAuthStorage;
//!
//! let storage = PostgresAuthStorage::connect("postgres://localhost/docket", 10).await?;
//! storage.ensure_schema().await?;
//! let state = docket_auth::OAuthState::new(storage.stores(), config);
//! ```

pub mod client;
pub mod code;
pub mod grant;
pub mod schema;
pub mod session;

use std::sync::Arc;

use docket_auth::storage::AuthStores;
use docket_auth::{AuthError, AuthResult};
use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

pub use client::PgClientStorage;
pub use code::PgCodeStorage;
pub use grant::PgGrantStorage;
pub use session::PgSessionStore;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Resource already exists (conflict).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored row holds a value the domain types cannot represent.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl StorageError {
    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create an `InvalidData` error.
    #[must_use]
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Maps unique-constraint violations to `Conflict`.
    fn from_insert(err: sqlx_core::Error, what: &str) -> Self {
        match &err {
            sqlx_core::Error::Database(db) if db.is_unique_violation() => {
                Self::conflict(format!("{what} already exists"))
            }
            _ => Self::Database(err),
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::storage(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Runs a storage operation and converts its error at the trait boundary.
pub(crate) fn into_auth<T>(result: StorageResult<T>) -> AuthResult<T> {
    result.map_err(AuthError::from)
}

/// PostgreSQL storage backend for authorization data.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        use sqlx_core::pool::PoolOptions;
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the auth tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        schema::ensure_schema(&self.pool).await
    }

    /// Arc-owning storage handles for the authorization server.
    #[must_use]
    pub fn stores(&self) -> AuthStores {
        AuthStores {
            clients: Arc::new(PgClientStorage::new(self.pool.clone())),
            codes: Arc::new(PgCodeStorage::new(self.pool.clone())),
            grants: Arc::new(PgGrantStorage::new(self.pool.clone())),
            sessions: Arc::new(PgSessionStore::new(self.pool.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_maps_to_server_error() {
        let err: AuthError = StorageError::conflict("client abc").into();
        assert_eq!(err.oauth_error_code(), "server_error");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_conflict_predicate() {
        assert!(StorageError::conflict("x").is_conflict());
        assert!(!StorageError::invalid_data("x").is_conflict());
    }
}
