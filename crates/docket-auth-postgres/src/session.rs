//! Read-only access to the login subsystem's sessions.

use std::sync::Arc;

use async_trait::async_trait;
use docket_auth::AuthResult;
use docket_auth::storage::SessionStore;
use docket_auth::types::UserSession;
use sqlx_core::query_as::query_as;

use crate::{PgPool, StorageResult, into_auth};

/// Resolves session ids against `user_sessions`. Expired rows are ignored.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: Arc<PgPool>,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn find_active(&self, session_id: &str) -> StorageResult<Option<UserSession>> {
        let row: Option<(String,)> = query_as(
            "SELECT user_id FROM user_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|(user_id,)| UserSession { user_id }))
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, session_id: &str) -> AuthResult<Option<UserSession>> {
        into_auth(self.find_active(session_id).await)
    }
}
