//! Registered OAuth client types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// OAuth 2.0 grant types a client may be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow with PKCE.
    AuthorizationCode,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// Grant types assigned when registration omits `grant_types`.
    pub const DEFAULT: [GrantType; 2] = [GrantType::AuthorizationCode, GrantType::RefreshToken];

    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Parses a grant_type parameter value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// OAuth 2.0 response types. Only the code flow exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// `response_type=code`
    Code,
}

impl ResponseType {
    /// Returns the response_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
        }
    }
}

/// Token endpoint authentication method. Every client is public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TokenEndpointAuthMethod {
    /// Public client, no secret. PKCE binds the code instead.
    #[default]
    #[serde(rename = "none")]
    None,
}

impl TokenEndpointAuthMethod {
    /// Returns the metadata value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
        }
    }
}

/// A registered public OAuth client.
///
/// Immutable after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthClient {
    /// Server-generated identifier (32 lowercase hex characters).
    pub client_id: String,

    /// Sanitized display name.
    pub name: Option<String>,

    /// Exact redirect URIs this client may use, in registration order.
    pub redirect_uris: Vec<String>,

    /// Token endpoint authentication method.
    pub auth_method: TokenEndpointAuthMethod,

    /// Grant types this client may use.
    pub grant_types: Vec<GrantType>,

    /// Response types this client may use.
    pub response_types: Vec<ResponseType>,

    /// When the client was registered.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

impl OAuthClient {
    /// Returns `true` if `uri` is byte-for-byte one of the registered
    /// redirect URIs.
    ///
    /// No normalization happens: trailing slashes, case, percent-encoding
    /// and dot segments all count.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Returns `true` if the client is registered for the grant type.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OAuthClient {
        OAuthClient {
            client_id: "0123456789abcdef0123456789abcdef".to_string(),
            name: Some("Test".to_string()),
            redirect_uris: vec!["https://claude.ai/api/mcp/auth_callback".to_string()],
            auth_method: TokenEndpointAuthMethod::None,
            grant_types: GrantType::DEFAULT.to_vec(),
            response_types: vec![ResponseType::Code],
            issued_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn test_redirect_uri_exact_match() {
        let client = client();
        assert!(client.is_redirect_uri_allowed("https://claude.ai/api/mcp/auth_callback"));
    }

    #[test]
    fn test_redirect_uri_no_normalization() {
        let client = client();
        for uri in [
            "https://claude.ai/api/mcp/auth_callback/",
            "HTTPS://claude.ai/api/mcp/auth_callback",
            "https://claude.ai/api/mcp/../mcp/auth_callback",
            "https://claude.ai/api/mcp/auth%5Fcallback",
            "https://claude.ai/../../../evil-path",
            "https://claude.ai/api/mcp/auth_callback?x=1",
        ] {
            assert!(!client.is_redirect_uri_allowed(uri), "{uri} should not match");
        }
    }

    #[test]
    fn test_grant_type_round_trip_names() {
        assert_eq!(GrantType::parse("authorization_code"), Some(GrantType::AuthorizationCode));
        assert_eq!(GrantType::parse("refresh_token"), Some(GrantType::RefreshToken));
        assert_eq!(GrantType::parse("password"), None);
        assert!(client().is_grant_type_allowed(GrantType::RefreshToken));
    }

    #[test]
    fn test_auth_method_serializes_as_none() {
        let json = serde_json::to_string(&TokenEndpointAuthMethod::None).unwrap();
        assert_eq!(json, "\"none\"");
    }
}
