//! Client registry and RFC 7591 dynamic client registration.
//!
//! Registered clients are public (`token_endpoint_auth_method=none`) and
//! immutable. Redirect URIs are matched exactly, so registration is the only
//! place they are parsed.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use time::OffsetDateTime;
use url::Url;

use crate::error::{AuthError, AuthResult};
use crate::sanitize::sanitize_free_text;
use crate::storage::ClientStorage;
use crate::types::{GrantType, OAuthClient, ResponseType, TokenEndpointAuthMethod};

/// Maximum number of redirect URIs per client.
pub const MAX_REDIRECT_URIS: usize = 20;

/// Maximum client name length, in characters.
pub const MAX_CLIENT_NAME_LENGTH: usize = 255;

/// Client metadata submitted to the registration endpoint.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientMetadata {
    #[serde(default)]
    pub redirect_uris: Option<Vec<String>>,

    #[serde(default)]
    pub client_name: Option<String>,

    #[serde(default)]
    pub token_endpoint_auth_method: Option<String>,

    #[serde(default)]
    pub grant_types: Option<Vec<String>>,

    #[serde(default)]
    pub response_types: Option<Vec<String>>,
}

/// Looks up and registers OAuth clients.
pub struct ClientRegistry {
    storage: Arc<dyn ClientStorage>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self { storage }
    }

    /// Finds a registered client.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lookup fails.
    pub async fn lookup(&self, client_id: &str) -> AuthResult<Option<OAuthClient>> {
        self.storage.find_by_client_id(client_id).await
    }

    /// Validates client metadata and registers a new client.
    ///
    /// # Errors
    ///
    /// - `InvalidRedirectUri` if `redirect_uris` is missing, empty, longer
    ///   than [`MAX_REDIRECT_URIS`], or holds a URI that is unparseable or
    ///   uses a disallowed scheme/host
    /// - `InvalidClientMetadata` for a bad name, auth method, grant types or
    ///   response types
    /// - `Storage` if the client cannot be persisted
    pub async fn register(&self, metadata: ClientMetadata) -> AuthResult<OAuthClient> {
        let redirect_uris = validate_redirect_uris(metadata.redirect_uris.as_deref())?;
        let name = validate_client_name(metadata.client_name.as_deref())?;
        validate_auth_method(metadata.token_endpoint_auth_method.as_deref())?;
        let grant_types = validate_grant_types(metadata.grant_types.as_deref())?;
        let response_types = validate_response_types(metadata.response_types.as_deref())?;

        let client = OAuthClient {
            client_id: generate_client_id(),
            name,
            redirect_uris,
            auth_method: TokenEndpointAuthMethod::None,
            grant_types,
            response_types,
            issued_at: OffsetDateTime::now_utc(),
        };

        if let Err(e) = self.storage.create(&client).await {
            tracing::error!(error = %e, "Failed to persist client registration");
            return Err(AuthError::storage("Failed to persist client registration"));
        }

        tracing::info!(
            client_id = %client.client_id,
            redirect_uri_count = client.redirect_uris.len(),
            "OAuth client registered"
        );

        Ok(client)
    }
}

/// Generates a client ID: 16 random bytes as lowercase hex.
fn generate_client_id() -> String {
    let mut bytes = [0u8; 16];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    hex::encode(bytes)
}

fn validate_redirect_uris(uris: Option<&[String]>) -> AuthResult<Vec<String>> {
    let uris = match uris {
        Some(uris) if !uris.is_empty() => uris,
        _ => {
            return Err(AuthError::invalid_redirect_uri(
                "redirect_uris must contain at least one URI",
            ));
        }
    };

    if uris.len() > MAX_REDIRECT_URIS {
        return Err(AuthError::invalid_redirect_uri(format!(
            "redirect_uris may contain at most {MAX_REDIRECT_URIS} URIs"
        )));
    }

    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(uris.len());
    for uri in uris {
        let parsed = Url::parse(uri)
            .map_err(|_| AuthError::invalid_redirect_uri("redirect_uris must be absolute URLs"))?;

        if !is_allowed_redirect_target(&parsed) {
            return Err(AuthError::invalid_redirect_uri(
                "redirect_uris must use https, or http on localhost or 127.0.0.1",
            ));
        }

        // Stored as submitted; matching later is byte-exact.
        if seen.insert(uri.as_str()) {
            accepted.push(uri.clone());
        }
    }

    Ok(accepted)
}

fn is_allowed_redirect_target(url: &Url) -> bool {
    match url.scheme() {
        "https" => url.host_str().is_some(),
        "http" => matches!(url.host_str(), Some("localhost" | "127.0.0.1")),
        _ => false,
    }
}

fn validate_client_name(name: Option<&str>) -> AuthResult<Option<String>> {
    let Some(name) = name else {
        return Ok(None);
    };

    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AuthError::invalid_client_metadata(
            "client_name must not be empty",
        ));
    }
    if trimmed.chars().count() > MAX_CLIENT_NAME_LENGTH {
        return Err(AuthError::invalid_client_metadata(format!(
            "client_name must be at most {MAX_CLIENT_NAME_LENGTH} characters"
        )));
    }

    Ok(Some(sanitize_free_text(trimmed)))
}

fn validate_auth_method(method: Option<&str>) -> AuthResult<()> {
    match method {
        None | Some("none") => Ok(()),
        Some(_) => Err(AuthError::invalid_client_metadata(
            "token_endpoint_auth_method must be \"none\"",
        )),
    }
}

fn validate_grant_types(grant_types: Option<&[String]>) -> AuthResult<Vec<GrantType>> {
    let grant_types = match grant_types {
        Some(values) if !values.is_empty() => values,
        _ => return Ok(GrantType::DEFAULT.to_vec()),
    };

    let mut accepted = Vec::new();
    for value in grant_types {
        let grant_type = GrantType::parse(value).ok_or_else(|| {
            AuthError::invalid_client_metadata(
                "grant_types may only contain authorization_code and refresh_token",
            )
        })?;
        if !accepted.contains(&grant_type) {
            accepted.push(grant_type);
        }
    }
    Ok(accepted)
}

fn validate_response_types(response_types: Option<&[String]>) -> AuthResult<Vec<ResponseType>> {
    match response_types {
        None => Ok(vec![ResponseType::Code]),
        Some([only]) if only == "code" => Ok(vec![ResponseType::Code]),
        Some(_) => Err(AuthError::invalid_client_metadata(
            "response_types must be [\"code\"]",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn registry() -> ClientRegistry {
        ClientRegistry::new(Arc::new(MemoryStorage::new()))
    }

    fn metadata(uris: &[&str]) -> ClientMetadata {
        ClientMetadata {
            redirect_uris: Some(uris.iter().map(|u| u.to_string()).collect()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_defaults() {
        let registry = registry();
        let client = registry
            .register(metadata(&["http://localhost:3000/callback"]))
            .await
            .unwrap();

        assert_eq!(client.client_id.len(), 32);
        assert!(client.client_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            client.grant_types,
            vec![GrantType::AuthorizationCode, GrantType::RefreshToken]
        );
        assert_eq!(client.response_types, vec![ResponseType::Code]);
        assert_eq!(client.auth_method, TokenEndpointAuthMethod::None);

        let found = registry.lookup(&client.client_id).await.unwrap();
        assert_eq!(found, Some(client));
    }

    #[tokio::test]
    async fn test_register_requires_redirect_uris() {
        let registry = registry();
        let err = registry.register(ClientMetadata::default()).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_redirect_uri");

        let err = registry.register(metadata(&[])).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_redirect_uri");
    }

    #[tokio::test]
    async fn test_register_rejects_too_many_redirect_uris() {
        let uris: Vec<String> = (0..21)
            .map(|i| format!("https://app.example.com/cb/{i}"))
            .collect();
        let refs: Vec<&str> = uris.iter().map(String::as_str).collect();

        let err = registry().register(metadata(&refs)).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_redirect_uri");

        let ok = registry().register(metadata(&refs[..20])).await.unwrap();
        assert_eq!(ok.redirect_uris.len(), 20);
    }

    #[tokio::test]
    async fn test_register_redirect_scheme_rules() {
        for uri in [
            "http://example.com/callback",
            "http://localhost.evil.com/callback",
            "javascript:alert(1)",
            "custom-app://callback",
            "not a url",
            "/relative/path",
        ] {
            let err = registry().register(metadata(&[uri])).await.unwrap_err();
            assert_eq!(err.oauth_error_code(), "invalid_redirect_uri", "{uri}");
        }

        for uri in [
            "https://claude.ai/api/mcp/auth_callback",
            "http://localhost:3000/callback",
            "http://127.0.0.1:8976/cb",
        ] {
            assert!(registry().register(metadata(&[uri])).await.is_ok(), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_register_deduplicates_redirect_uris() {
        let client = registry()
            .register(metadata(&[
                "https://a.example.com/cb",
                "https://b.example.com/cb",
                "https://a.example.com/cb",
            ]))
            .await
            .unwrap();
        assert_eq!(
            client.redirect_uris,
            vec!["https://a.example.com/cb", "https://b.example.com/cb"]
        );
    }

    #[tokio::test]
    async fn test_register_sanitizes_name() {
        let mut meta = metadata(&["https://app.example.com/cb"]);
        meta.client_name = Some("  <b>Evil</b>\u{0}App  ".to_string());
        let client = registry().register(meta).await.unwrap();
        assert_eq!(client.name.as_deref(), Some("&lt;b&gt;Evil&lt;/b&gt;App"));
    }

    #[tokio::test]
    async fn test_register_name_limits() {
        let mut meta = metadata(&["https://app.example.com/cb"]);
        meta.client_name = Some("   ".to_string());
        let err = registry().register(meta.clone()).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_client_metadata");

        meta.client_name = Some("x".repeat(256));
        let err = registry().register(meta.clone()).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_client_metadata");

        meta.client_name = Some("x".repeat(255));
        assert!(registry().register(meta).await.is_ok());
    }

    #[tokio::test]
    async fn test_register_rejects_confidential_and_foreign_grants() {
        let mut meta = metadata(&["https://app.example.com/cb"]);
        meta.token_endpoint_auth_method = Some("client_secret_basic".to_string());
        let err = registry().register(meta).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_client_metadata");

        let mut meta = metadata(&["https://app.example.com/cb"]);
        meta.grant_types = Some(vec!["client_credentials".to_string()]);
        let err = registry().register(meta).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_client_metadata");

        let mut meta = metadata(&["https://app.example.com/cb"]);
        meta.response_types = Some(vec!["token".to_string()]);
        let err = registry().register(meta).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_client_metadata");
    }

    #[tokio::test]
    async fn test_register_grant_subset() {
        let mut meta = metadata(&["https://app.example.com/cb"]);
        meta.grant_types = Some(vec!["authorization_code".to_string()]);
        let client = registry().register(meta).await.unwrap();
        assert_eq!(client.grant_types, vec![GrantType::AuthorizationCode]);
    }

    #[tokio::test]
    async fn test_lookup_unknown_client() {
        assert!(registry().lookup("missing").await.unwrap().is_none());
    }
}
