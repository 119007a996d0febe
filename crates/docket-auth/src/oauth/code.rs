//! Issuing and consuming authorization codes.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::error::{AuthError, AuthResult};
use crate::oauth::pkce::PkceChallengeMethod;
use crate::storage::AuthorizationCodeStorage;
use crate::types::{AuthorizationCode, ScopeSet, generate_token};

/// Everything recorded when a user approves an authorization request.
#[derive(Debug, Clone)]
pub struct IssueCode {
    pub user_id: String,
    pub client_id: String,
    /// Already sanitized.
    pub device_name: String,
    pub code_challenge: String,
    pub code_challenge_method: PkceChallengeMethod,
    pub scopes: ScopeSet,
    pub redirect_uri: String,
}

/// Issues single-use authorization codes and consumes them atomically.
pub struct AuthorizationCodeStore {
    storage: Arc<dyn AuthorizationCodeStorage>,
    lifetime: Duration,
}

impl AuthorizationCodeStore {
    #[must_use]
    pub fn new(storage: Arc<dyn AuthorizationCodeStorage>, lifetime: Duration) -> Self {
        Self { storage, lifetime }
    }

    /// Persists a fresh code and returns its value.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the code cannot be persisted.
    pub async fn issue(&self, request: IssueCode) -> AuthResult<String> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now
            .checked_add(self.lifetime)
            .ok_or_else(|| AuthError::internal("Authorization code lifetime out of range"))?;
        let record = AuthorizationCode {
            code: generate_token(),
            user_id: request.user_id,
            client_id: request.client_id,
            device_name: request.device_name,
            code_challenge: request.code_challenge,
            code_challenge_method: request.code_challenge_method,
            scopes: request.scopes,
            redirect_uri: request.redirect_uri,
            created_at: now,
            expires_at,
        };

        self.storage.create(&record).await?;

        tracing::debug!(
            client_id = %record.client_id,
            user_id = %record.user_id,
            "Authorization code issued"
        );

        Ok(record.code)
    }

    /// Consumes a code. The code is gone afterwards whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the code is unknown, already used or
    /// expired, and `Storage` if the delete itself fails.
    pub async fn consume(&self, code: &str) -> AuthResult<AuthorizationCode> {
        let record = self
            .storage
            .take(code)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Invalid or expired authorization code"))?;

        if record.is_expired_at(OffsetDateTime::now_utc()) {
            tracing::debug!(client_id = %record.client_id, "Expired authorization code presented");
            return Err(AuthError::invalid_grant(
                "Invalid or expired authorization code",
            ));
        }

        Ok(record)
    }

    /// Deletes expired codes.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the cleanup fails.
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        self.storage.cleanup_expired().await
    }
}
