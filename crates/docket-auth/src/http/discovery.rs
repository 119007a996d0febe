//! Discovery documents (RFC 8414 and RFC 9728).
//!
//! The issuer is derived per request from `X-Forwarded-Proto` and `Host`, so
//! the same deployment answers correctly behind a TLS-terminating proxy.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::IntoResponse;
use serde::Serialize;

use super::OAuthState;
use crate::types::Scope;

/// Authorization server metadata (RFC 8414).
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,
    pub revocation_endpoint: String,
    pub response_types_supported: Vec<&'static str>,
    pub grant_types_supported: Vec<&'static str>,
    pub code_challenge_methods_supported: Vec<&'static str>,
    pub token_endpoint_auth_methods_supported: Vec<&'static str>,
    pub revocation_endpoint_auth_methods_supported: Vec<&'static str>,
    pub scopes_supported: Vec<&'static str>,
}

impl AuthorizationServerMetadata {
    /// Builds the metadata document for `issuer`.
    #[must_use]
    pub fn build(issuer: &str, registration_enabled: bool) -> Self {
        Self {
            issuer: issuer.to_string(),
            authorization_endpoint: format!("{issuer}/oauth/authorize"),
            token_endpoint: format!("{issuer}/oauth/token"),
            registration_endpoint: registration_enabled.then(|| format!("{issuer}/oauth/register")),
            revocation_endpoint: format!("{issuer}/oauth/revoke"),
            response_types_supported: vec!["code"],
            grant_types_supported: vec!["authorization_code", "refresh_token"],
            code_challenge_methods_supported: vec!["S256"],
            token_endpoint_auth_methods_supported: vec!["none"],
            revocation_endpoint_auth_methods_supported: vec!["none"],
            scopes_supported: scopes_supported(),
        }
    }
}

/// Protected resource metadata (RFC 9728).
#[derive(Debug, Clone, Serialize)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub scopes_supported: Vec<&'static str>,
}

fn scopes_supported() -> Vec<&'static str> {
    Scope::ALL.iter().map(Scope::as_str).collect()
}

/// Derives the issuer URL from request headers.
///
/// Uses the first `X-Forwarded-Proto` value when it is `http` or `https`
/// (otherwise `http`) and the `Host` header. Falls back to `fallback`
/// unchanged when there is no usable Host.
#[must_use]
pub fn issuer_from_headers(headers: &HeaderMap, fallback: &str) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|h| !h.is_empty());

    let Some(host) = host else {
        return fallback.to_string();
    };

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| v == "http" || v == "https")
        .unwrap_or_else(|| "http".to_string());

    format!("{proto}://{host}")
}

/// Handler for `GET /.well-known/oauth-authorization-server`.
pub async fn authorization_server_metadata_handler(
    State(state): State<OAuthState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let issuer = issuer_from_headers(&headers, state.config.issuer_base());
    let metadata =
        AuthorizationServerMetadata::build(&issuer, state.config.dynamic_registration_enabled);
    ([(header::CONTENT_TYPE, "application/json")], Json(metadata))
}

/// Handler for `GET /.well-known/oauth-protected-resource`.
pub async fn protected_resource_metadata_handler(
    State(state): State<OAuthState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let issuer = issuer_from_headers(&headers, state.config.issuer_base());
    Json(ProtectedResourceMetadata {
        resource: issuer.clone(),
        authorization_servers: vec![issuer],
        scopes_supported: scopes_supported(),
    })
}
