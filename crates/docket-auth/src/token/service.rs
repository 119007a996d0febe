//! Token service: code exchange and refresh token rotation.
//!
//! # Usage
//!
//! ```ignore
//! use docket_auth::token::{TokenConfig, TokenService};
//!
//! let service = TokenService::new(codes, stores.grants.clone(), TokenConfig::default());
//! let response = service.handle(&request).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::code::AuthorizationCodeStore;
use crate::oauth::pkce::PkceChallenge;
use crate::storage::TokenGrantStorage;
use crate::types::{GrantRotation, GrantType, ScopeSet, TokenGrant, generate_token, hash_token};

/// Token request parameters, from a form or JSON body.
///
/// - `authorization_code`: code, code_verifier, optional redirect_uri and
///   client_id
/// - `refresh_token`: refresh_token
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: Option<String>,

    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Must equal the code's redirect URI when present.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Must equal the code's client when present.
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Successful token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// Always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    pub refresh_token: String,

    /// Granted scopes, space-separated.
    pub scope: String,
}

impl TokenResponse {
    fn new(access_token: String, refresh_token: String, expires_in: u64, scopes: &ScopeSet) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            refresh_token,
            scope: scopes.to_string(),
        }
    }
}

/// Configuration for the token service.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Reported as `expires_in`.
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime, restarted on every rotation.
    pub refresh_token_lifetime: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime: Duration::hours(1),
            refresh_token_lifetime: Duration::days(30),
        }
    }
}

/// Issues and rotates token grants.
pub struct TokenService {
    codes: Arc<AuthorizationCodeStore>,
    grants: Arc<dyn TokenGrantStorage>,
    config: TokenConfig,
}

impl TokenService {
    #[must_use]
    pub fn new(
        codes: Arc<AuthorizationCodeStore>,
        grants: Arc<dyn TokenGrantStorage>,
        config: TokenConfig,
    ) -> Self {
        Self {
            codes,
            grants,
            config,
        }
    }

    /// Dispatches a token request on its `grant_type`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `grant_type` or a grant's required parameter
    ///   is missing
    /// - `UnsupportedGrantType` for any other grant type
    /// - whatever the grant handler returns
    pub async fn handle(&self, request: &TokenRequest) -> AuthResult<TokenResponse> {
        let grant_type = non_empty(request.grant_type.as_deref())
            .ok_or_else(|| AuthError::invalid_request("grant_type is required"))?;

        match GrantType::parse(grant_type) {
            Some(GrantType::AuthorizationCode) => {
                let code = non_empty(request.code.as_deref())
                    .ok_or_else(|| AuthError::invalid_request("code is required"))?;
                let verifier = non_empty(request.code_verifier.as_deref())
                    .ok_or_else(|| AuthError::invalid_request("code_verifier is required"))?;
                self.exchange_code(
                    code,
                    verifier,
                    request.redirect_uri.as_deref(),
                    request.client_id.as_deref(),
                )
                .await
            }
            Some(GrantType::RefreshToken) => {
                let refresh_token = non_empty(request.refresh_token.as_deref())
                    .ok_or_else(|| AuthError::invalid_request("refresh_token is required"))?;
                self.refresh(refresh_token).await
            }
            None => Err(AuthError::unsupported_grant_type(grant_type)),
        }
    }

    /// Exchanges an authorization code for a new token grant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the code is unknown, spent or expired, or
    /// if the redirect URI, client or PKCE verifier does not match. Returns
    /// `Storage` if the grant cannot be persisted.
    ///
    /// # Security
    ///
    /// The code is consumed before any other check, so a failed exchange
    /// still burns it. A consumed code is never restored.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: Option<&str>,
        client_id: Option<&str>,
    ) -> AuthResult<TokenResponse> {
        let now = OffsetDateTime::now_utc();
        let expires_at = self.refresh_expiry(now)?;

        let record = self.codes.consume(code).await?;

        if let Some(redirect_uri) = redirect_uri {
            if redirect_uri != record.redirect_uri {
                return Err(AuthError::invalid_grant(
                    "redirect_uri does not match authorization request",
                ));
            }
        }

        if let Some(client_id) = client_id {
            if client_id != record.client_id {
                return Err(AuthError::invalid_grant(
                    "Authorization code was issued to a different client",
                ));
            }
        }

        let challenge = PkceChallenge::new(record.code_challenge.clone())
            .map_err(|_| AuthError::invalid_grant("PKCE verification failed"))?;
        if challenge.verify(code_verifier).is_err() {
            tracing::info!(client_id = %record.client_id, "PKCE verification failed, code discarded");
            return Err(AuthError::invalid_grant("PKCE verification failed"));
        }

        let access_token = generate_token();
        let refresh_token = generate_token();
        let grant = TokenGrant {
            id: Uuid::new_v4(),
            user_id: record.user_id,
            client_id: record.client_id,
            device_name: record.device_name,
            access_token_hash: hash_token(&access_token),
            refresh_token_hash: hash_token(&refresh_token),
            scopes: record.scopes,
            created_at: now,
            expires_at,
        };

        if let Err(e) = self.grants.create(&grant).await {
            tracing::error!(
                error = %e,
                client_id = %grant.client_id,
                "Failed to persist token grant after consuming authorization code"
            );
            return Err(AuthError::storage("Failed to persist token grant"));
        }

        tracing::info!(
            grant_id = %grant.id,
            client_id = %grant.client_id,
            user_id = %grant.user_id,
            "Authorization code exchanged for tokens"
        );

        Ok(TokenResponse::new(
            access_token,
            refresh_token,
            self.expires_in(),
            &grant.scopes,
        ))
    }

    /// Rotates a grant's tokens using its current refresh token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the refresh token is unknown, expired or
    /// was already rotated by a concurrent request. Expired grants are
    /// deleted on sight.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenResponse> {
        let presented_hash = hash_token(refresh_token);

        let grant = self
            .grants
            .find_by_refresh_hash(&presented_hash)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Invalid refresh token"))?;

        let now = OffsetDateTime::now_utc();
        if grant.is_expired_at(now) {
            if let Err(e) = self.grants.delete(grant.id).await {
                tracing::warn!(error = %e, grant_id = %grant.id, "Failed to delete expired grant");
            }
            return Err(AuthError::invalid_grant("Refresh token expired"));
        }

        let expires_at = self.refresh_expiry(now)?;
        let access_token = generate_token();
        let new_refresh_token = generate_token();
        let rotation = GrantRotation {
            id: grant.id,
            expected_refresh_hash: presented_hash,
            access_token_hash: hash_token(&access_token),
            refresh_token_hash: hash_token(&new_refresh_token),
            expires_at,
        };

        let rotated = self
            .grants
            .rotate(&rotation)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Invalid refresh token"))?;

        tracing::info!(
            grant_id = %rotated.id,
            client_id = %rotated.client_id,
            "Refresh token rotated"
        );

        Ok(TokenResponse::new(
            access_token,
            new_refresh_token,
            self.expires_in(),
            &rotated.scopes,
        ))
    }

    fn refresh_expiry(&self, now: OffsetDateTime) -> AuthResult<OffsetDateTime> {
        now.checked_add(self.config.refresh_token_lifetime)
            .ok_or_else(|| AuthError::internal("Refresh token lifetime out of range"))
    }

    fn expires_in(&self) -> u64 {
        self.config.access_token_lifetime.whole_seconds().max(0) as u64
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
