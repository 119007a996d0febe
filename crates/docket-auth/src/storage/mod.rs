//! Storage traits for authorization server data.
//!
//! This module defines storage interfaces for:
//!
//! - OAuth client registrations
//! - Authorization codes
//! - Token grants (hashed access/refresh pairs)
//! - User sessions, owned by the login subsystem and only read here
//!
//! # Implementations
//!
//! - [`memory::MemoryStorage`] - in-process backend for development and tests
//! - `docket-auth-postgres` - PostgreSQL storage backend

pub mod client;
pub mod code;
pub mod grant;
pub mod memory;
pub mod session;

use std::sync::Arc;

pub use client::ClientStorage;
pub use code::AuthorizationCodeStorage;
pub use grant::TokenGrantStorage;
pub use memory::MemoryStorage;
pub use session::SessionStore;

/// The full set of storage handles the authorization server needs.
#[derive(Clone)]
pub struct AuthStores {
    pub clients: Arc<dyn ClientStorage>,
    pub codes: Arc<dyn AuthorizationCodeStorage>,
    pub grants: Arc<dyn TokenGrantStorage>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AuthStores {
    /// Backs every store with one shared in-memory backend.
    #[must_use]
    pub fn memory(storage: Arc<MemoryStorage>) -> Self {
        Self {
            clients: storage.clone(),
            codes: storage.clone(),
            grants: storage.clone(),
            sessions: storage,
        }
    }
}
