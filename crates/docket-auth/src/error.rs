//! Authorization server error types.
//!
//! Every failure the OAuth endpoints can report is one variant of
//! [`AuthError`]. Each variant maps to exactly one OAuth error code and one
//! HTTP status, so handlers never pick codes ad hoc.

use std::fmt;

/// Errors that can occur while serving OAuth requests.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is missing a parameter or is otherwise malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The client is missing or not registered.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The authorization server only issues `response_type=code`.
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType {
        /// The rejected response type.
        response_type: String,
    },

    /// None of the requested scopes are supported.
    #[error("Invalid scope: {message}")]
    InvalidScope {
        /// Description of why the scope is invalid.
        message: String,
    },

    /// The authorization code or refresh token is invalid, expired or spent.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The token endpoint does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The rejected grant type.
        grant_type: String,
    },

    /// Registration rejected one of the submitted redirect URIs.
    #[error("Invalid redirect URI: {message}")]
    InvalidRedirectUri {
        /// Description of why the redirect URIs were rejected.
        message: String,
    },

    /// Registration rejected the submitted client metadata.
    #[error("Invalid client metadata: {message}")]
    InvalidClientMetadata {
        /// Description of why the metadata was rejected.
        message: String,
    },

    /// The resource owner denied the request.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Description of why access was denied.
        message: String,
    },

    /// The request needs an authenticated user session.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// The addressed resource does not exist for the caller.
    #[error("Not found: {message}")]
    NotFound {
        /// Description of what was not found.
        message: String,
    },

    /// Storing or retrieving authorization data failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedResponseType` error.
    #[must_use]
    pub fn unsupported_response_type(response_type: impl Into<String>) -> Self {
        Self::UnsupportedResponseType {
            response_type: response_type.into(),
        }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::InvalidScope {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `InvalidRedirectUri` error.
    #[must_use]
    pub fn invalid_redirect_uri(message: impl Into<String>) -> Self {
        Self::InvalidRedirectUri {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClientMetadata` error.
    #[must_use]
    pub fn invalid_client_metadata(message: impl Into<String>) -> Self {
        Self::InvalidClientMetadata {
            message: message.into(),
        }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::InvalidRedirectUri { .. } => "invalid_redirect_uri",
            Self::InvalidClientMetadata { .. } => "invalid_client_metadata",
            Self::AccessDenied { .. } => "access_denied",
            Self::Unauthorized { .. } => "unauthorized",
            Self::NotFound { .. } => "not_found",
            Self::Storage { .. } | Self::Internal { .. } => "server_error",
        }
    }

    /// Returns the HTTP status code this error is reported with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized { .. } => 401,
            Self::NotFound { .. } => 404,
            Self::Storage { .. } | Self::Internal { .. } => 500,
            _ => 400,
        }
    }

    /// Human-readable description safe to return to the caller.
    ///
    /// Server-side failures get a fixed description so storage details never
    /// leave the process.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::InvalidRequest { message }
            | Self::InvalidClient { message }
            | Self::InvalidScope { message }
            | Self::InvalidGrant { message }
            | Self::InvalidRedirectUri { message }
            | Self::InvalidClientMetadata { message }
            | Self::AccessDenied { message }
            | Self::Unauthorized { message }
            | Self::NotFound { message } => message.clone(),
            Self::UnsupportedResponseType { .. } => {
                "Only response_type=code is supported".to_string()
            }
            Self::UnsupportedGrantType { .. } => {
                "Supported grant types: authorization_code, refresh_token".to_string()
            }
            Self::Storage { .. } | Self::Internal { .. } => {
                "The server encountered an unexpected error".to_string()
            }
        }
    }

    /// Returns `true` if this error is a server-side failure.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Internal { .. })
    }

    /// Returns the error category for logging and monitoring.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidClient { .. } | Self::InvalidGrant { .. } => ErrorCategory::Authentication,
            Self::AccessDenied { .. } | Self::Unauthorized { .. } | Self::NotFound { .. } => {
                ErrorCategory::Authorization
            }
            Self::InvalidRequest { .. }
            | Self::UnsupportedResponseType { .. }
            | Self::InvalidScope { .. }
            | Self::UnsupportedGrantType { .. } => ErrorCategory::Validation,
            Self::InvalidRedirectUri { .. } | Self::InvalidClientMetadata { .. } => {
                ErrorCategory::Registration
            }
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of authorization errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Client or grant could not be authenticated.
    Authentication,
    /// The caller may not perform the action.
    Authorization,
    /// The request failed validation.
    Validation,
    /// Dynamic client registration rejected the metadata.
    Registration,
    /// Storage or other infrastructure failure.
    Infrastructure,
    /// Unexpected internal failure.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::Registration => write!(f, "registration"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Convenience result alias for authorization operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_statuses() {
        let cases = [
            (AuthError::invalid_request("x"), "invalid_request", 400),
            (AuthError::invalid_client("x"), "invalid_client", 400),
            (
                AuthError::unsupported_response_type("token"),
                "unsupported_response_type",
                400,
            ),
            (AuthError::invalid_scope("x"), "invalid_scope", 400),
            (AuthError::invalid_grant("x"), "invalid_grant", 400),
            (
                AuthError::unsupported_grant_type("password"),
                "unsupported_grant_type",
                400,
            ),
            (AuthError::invalid_redirect_uri("x"), "invalid_redirect_uri", 400),
            (
                AuthError::invalid_client_metadata("x"),
                "invalid_client_metadata",
                400,
            ),
            (AuthError::unauthorized("x"), "unauthorized", 401),
            (AuthError::not_found("x"), "not_found", 404),
            (AuthError::storage("x"), "server_error", 500),
            (AuthError::internal("x"), "server_error", 500),
        ];

        for (err, code, status) in cases {
            assert_eq!(err.oauth_error_code(), code);
            assert_eq!(err.status_code(), status, "status for {code}");
        }
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AuthError::storage("connection to 10.0.0.3 refused");
        assert!(err.is_server_error());
        assert!(!err.description().contains("10.0.0.3"));
    }

    #[test]
    fn test_unsupported_values_not_echoed() {
        let err = AuthError::unsupported_grant_type("<script>");
        assert!(!err.description().contains("<script>"));
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::invalid_grant("x").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            AuthError::invalid_redirect_uri("x").category(),
            ErrorCategory::Registration
        );
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}
