//! Authorization server configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Authorization server configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://docket.example.com"
/// access_token_lifetime = "1h"
/// refresh_token_lifetime = "30d"
/// dynamic_registration_enabled = true
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Fallback issuer URL, used when the request carries no Host header.
    pub issuer: String,

    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token lifetime. Reported as `expires_in`.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime. Reset on every rotation.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Path of the login page unauthenticated users are sent to.
    pub login_path: String,

    /// Path of the consent page.
    pub consent_path: String,

    /// Name of the cookie carrying the login session ID.
    pub session_cookie: String,

    /// Expose `POST /oauth/register` (RFC 7591).
    pub dynamic_registration_enabled: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            access_token_lifetime: Duration::from_secs(3600),      // 1 hour
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
            login_path: "/login".to_string(),
            consent_path: "/oauth/consent".to_string(),
            session_cookie: "session".to_string(),
            dynamic_registration_enabled: true,
        }
    }
}

/// Upper bound for every configured lifetime (ten years).
pub const MAX_LIFETIME: Duration = Duration::from_secs(3650 * 86_400);

/// Configuration validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the issuer or session cookie name is
    /// empty, and `ConfigError::InvalidValue` if a lifetime is zero or above
    /// [`MAX_LIFETIME`], the
    /// issuer is not an http(s) URL, or a page path is not absolute.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::Missing("auth.issuer".to_string()));
        }
        match url::Url::parse(&self.issuer) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.issuer must be an http(s) URL, got '{}'",
                    self.issuer
                )));
            }
        }

        for (name, lifetime) in [
            ("authorization_code_lifetime", self.authorization_code_lifetime),
            ("access_token_lifetime", self.access_token_lifetime),
            ("refresh_token_lifetime", self.refresh_token_lifetime),
        ] {
            if lifetime.is_zero() {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.{name} must be greater than zero"
                )));
            }
            if lifetime > MAX_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.{name} must be at most 3650 days"
                )));
            }
        }

        for (name, path) in [
            ("login_path", &self.login_path),
            ("consent_path", &self.consent_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.{name} must start with '/', got '{path}'"
                )));
            }
        }

        if self.session_cookie.is_empty() {
            return Err(ConfigError::Missing("auth.session_cookie".to_string()));
        }

        Ok(())
    }

    /// Issuer with any trailing slash removed.
    #[must_use]
    pub fn issuer_base(&self) -> &str {
        self.issuer.trim_end_matches('/')
    }
}

/// Converts a configured lifetime into a `time::Duration`, capped at
/// [`MAX_LIFETIME`].
#[must_use]
pub fn lifetime(duration: Duration) -> time::Duration {
    let capped = duration.min(MAX_LIFETIME);
    time::Duration::try_from(capped).unwrap_or(time::Duration::days(3650))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.authorization_code_lifetime, Duration::from_secs(600));
        assert_eq!(config.access_token_lifetime, Duration::from_secs(3600));
        assert_eq!(config.refresh_token_lifetime, Duration::from_secs(2_592_000));
        assert!(config.dynamic_registration_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_humantime_durations() {
        let config: AuthConfig = serde_json::from_value(serde_json::json!({
            "access_token_lifetime": "15m",
            "refresh_token_lifetime": "7days",
        }))
        .unwrap();
        assert_eq!(config.access_token_lifetime, Duration::from_secs(900));
        assert_eq!(config.refresh_token_lifetime, Duration::from_secs(7 * 86_400));
        assert_eq!(config.login_path, "/login");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AuthConfig {
            issuer: String::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));

        let config = AuthConfig {
            issuer: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let config = AuthConfig {
            access_token_lifetime: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AuthConfig {
            login_path: "login".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lifetime_conversion() {
        assert_eq!(lifetime(Duration::from_secs(600)), time::Duration::minutes(10));
        assert_eq!(lifetime(Duration::MAX), time::Duration::days(3650));
    }

    #[test]
    fn test_validate_rejects_huge_lifetimes() {
        let config = AuthConfig {
            refresh_token_lifetime: Duration::from_secs(1_000_000_000_000),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let config = AuthConfig {
            access_token_lifetime: Duration::from_secs(u64::MAX),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AuthConfig {
            refresh_token_lifetime: MAX_LIFETIME,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_issuer_base_trims_slash() {
        let config = AuthConfig {
            issuer: "https://docket.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.issuer_base(), "https://docket.example.com");
    }
}
