//! Authorization request validation.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. `client_id` present and registered
//! 2. `response_type == "code"`
//! 3. `redirect_uri` exactly registered for the client
//! 4. PKCE challenge present with method `S256`
//! 5. at least one supported scope requested
//!
//! Errors are never redirected to the client's `redirect_uri`; they are
//! returned to the caller directly.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::{AuthError, AuthResult};
use crate::oauth::pkce::{PkceChallenge, PkceChallengeMethod};
use crate::oauth::registry::ClientRegistry;
use crate::types::{OAuthClient, ScopeSet};

/// Raw authorization request parameters, as received on the query string.
///
/// # Example
///
/// ```ignore
/// GET /oauth/authorize?
///   response_type=code
///   &client_id=4f1c0e6ab2d94c1e8a0d3b7c5e9f2a61
///   &redirect_uri=https://claude.ai/api/mcp/auth_callback
///   &scope=docs:read tasks:read
///   &state=abc123xyz
///   &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
///   &code_challenge_method=S256
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationParams {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// A request that passed every check.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub client: OAuthClient,
    pub redirect_uri: String,
    /// Supported scopes only, in request order.
    pub scopes: ScopeSet,
    pub state: Option<String>,
    pub code_challenge: PkceChallenge,
    pub code_challenge_method: PkceChallengeMethod,
}

/// Validates authorization requests against the client registry.
pub struct AuthorizationRequestValidator {
    registry: Arc<ClientRegistry>,
}

impl AuthorizationRequestValidator {
    #[must_use]
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as `InvalidClient`,
    /// `UnsupportedResponseType`, `InvalidRequest` or `InvalidScope`.
    /// Storage failures surface as `Storage`.
    pub async fn validate(&self, params: &AuthorizationParams) -> AuthResult<ValidatedRequest> {
        let client = self.resolve_client(params.client_id.as_deref()).await?;

        match params.response_type.as_deref() {
            Some("code") => {}
            other => {
                return Err(AuthError::unsupported_response_type(
                    other.unwrap_or_default(),
                ));
            }
        }

        let redirect_uri = require_registered_redirect(&client, params.redirect_uri.as_deref())?;

        let (code_challenge, code_challenge_method) = require_pkce(
            params.code_challenge.as_deref(),
            params.code_challenge_method.as_deref(),
        )?;

        let scopes = require_scopes(params.scope.as_deref())?;

        Ok(ValidatedRequest {
            client,
            redirect_uri,
            scopes,
            state: params.state.clone(),
            code_challenge,
            code_challenge_method,
        })
    }

    /// Resolves a `client_id` to a registered client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClient` if the ID is missing, empty or unknown.
    pub async fn resolve_client(&self, client_id: Option<&str>) -> AuthResult<OAuthClient> {
        let client_id = match client_id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(AuthError::invalid_client("client_id is required")),
        };

        self.registry
            .lookup(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))
    }
}

/// Requires `redirect_uri` to be one of the client's registered URIs.
///
/// # Errors
///
/// Returns `InvalidRequest` if it is missing or not registered.
pub fn require_registered_redirect(
    client: &OAuthClient,
    redirect_uri: Option<&str>,
) -> AuthResult<String> {
    match redirect_uri {
        Some(uri) if client.is_redirect_uri_allowed(uri) => Ok(uri.to_string()),
        _ => Err(AuthError::invalid_request("redirect_uri not allowed")),
    }
}

/// Requires an S256 PKCE challenge.
///
/// # Errors
///
/// Returns `InvalidRequest` if the challenge is missing or the method is
/// anything but `S256`.
pub fn require_pkce(
    challenge: Option<&str>,
    method: Option<&str>,
) -> AuthResult<(PkceChallenge, PkceChallengeMethod)> {
    let pkce_required = || AuthError::invalid_request("PKCE required (code_challenge with S256)");

    let method = method
        .and_then(|m| PkceChallengeMethod::parse(m).ok())
        .ok_or_else(pkce_required)?;
    let challenge = challenge
        .and_then(|c| PkceChallenge::new(c).ok())
        .ok_or_else(pkce_required)?;

    Ok((challenge, method))
}

/// Filters the requested scopes and requires at least one to survive.
///
/// # Errors
///
/// Returns `InvalidScope` if no supported scope was requested.
pub fn require_scopes(scope: Option<&str>) -> AuthResult<ScopeSet> {
    let scopes = ScopeSet::filter(scope.unwrap_or_default());
    if scopes.is_empty() {
        return Err(AuthError::invalid_scope("No supported scopes requested"));
    }
    Ok(scopes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::registry::ClientMetadata;
    use crate::storage::MemoryStorage;

    const REDIRECT: &str = "https://claude.ai/api/mcp/auth_callback";

    async fn setup() -> (AuthorizationRequestValidator, String) {
        let registry = Arc::new(ClientRegistry::new(Arc::new(MemoryStorage::new())));
        let client = registry
            .register(ClientMetadata {
                redirect_uris: Some(vec![REDIRECT.to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();
        (AuthorizationRequestValidator::new(registry), client.client_id)
    }

    fn params(client_id: &str) -> AuthorizationParams {
        AuthorizationParams {
            response_type: Some("code".into()),
            client_id: Some(client_id.into()),
            redirect_uri: Some(REDIRECT.into()),
            scope: Some("docs:read tasks:read".into()),
            state: Some("xyz".into()),
            code_challenge: Some("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".into()),
            code_challenge_method: Some("S256".into()),
        }
    }

    #[tokio::test]
    async fn test_valid_request() {
        let (validator, client_id) = setup().await;
        let validated = validator.validate(&params(&client_id)).await.unwrap();
        assert_eq!(validated.redirect_uri, REDIRECT);
        assert_eq!(validated.scopes.to_string(), "docs:read tasks:read");
        assert_eq!(validated.state.as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn test_missing_and_unknown_client() {
        let (validator, _) = setup().await;
        let mut p = params("");
        let err = validator.validate(&p).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_client");

        p.client_id = Some("unknown".into());
        let err = validator.validate(&p).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_client");
    }

    #[tokio::test]
    async fn test_response_type_must_be_code() {
        let (validator, client_id) = setup().await;
        let mut p = params(&client_id);
        p.response_type = Some("token".into());
        let err = validator.validate(&p).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "unsupported_response_type");

        p.response_type = None;
        let err = validator.validate(&p).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "unsupported_response_type");
    }

    #[tokio::test]
    async fn test_redirect_uri_exact_match() {
        let (validator, client_id) = setup().await;
        for uri in [
            "https://claude.ai/../../../evil-path",
            "https://claude.ai/api/mcp/auth_callback/",
            "https://evil.example.com/cb",
        ] {
            let mut p = params(&client_id);
            p.redirect_uri = Some(uri.into());
            let err = validator.validate(&p).await.unwrap_err();
            assert_eq!(err.oauth_error_code(), "invalid_request", "{uri}");
            assert_eq!(err.description(), "redirect_uri not allowed");
        }
    }

    #[tokio::test]
    async fn test_pkce_required() {
        let (validator, client_id) = setup().await;

        let mut p = params(&client_id);
        p.code_challenge_method = Some("plain".into());
        let err = validator.validate(&p).await.unwrap_err();
        assert_eq!(err.description(), "PKCE required (code_challenge with S256)");

        let mut p = params(&client_id);
        p.code_challenge_method = None;
        assert_eq!(
            validator.validate(&p).await.unwrap_err().oauth_error_code(),
            "invalid_request"
        );

        let mut p = params(&client_id);
        p.code_challenge = None;
        assert_eq!(
            validator.validate(&p).await.unwrap_err().oauth_error_code(),
            "invalid_request"
        );
    }

    #[tokio::test]
    async fn test_scope_filtering() {
        let (validator, client_id) = setup().await;
        let mut p = params(&client_id);
        p.scope = Some("docs:read invalid:scope tasks:read".into());
        let validated = validator.validate(&p).await.unwrap();
        assert_eq!(validated.scopes.to_string(), "docs:read tasks:read");

        p.scope = Some("admin openid".into());
        let err = validator.validate(&p).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_scope");
    }

    #[tokio::test]
    async fn test_check_order_client_before_redirect() {
        let (validator, _) = setup().await;
        let mut p = params("unknown");
        p.redirect_uri = Some("https://evil.example.com".into());
        p.response_type = Some("token".into());
        let err = validator.validate(&p).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_client");
    }
}
