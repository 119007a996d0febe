//! Authorization code records.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::scope::ScopeSet;
use crate::oauth::pkce::PkceChallengeMethod;

/// A single-use authorization code issued on consent approval.
///
/// Destroyed by the first consumption attempt, whether or not the
/// token exchange that follows succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The code value (256-bit random, base64url).
    pub code: String,

    /// User who approved the request.
    pub user_id: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Sanitized device label entered at consent.
    pub device_name: String,

    /// PKCE challenge from the authorization request.
    pub code_challenge: String,

    pub code_challenge_method: PkceChallengeMethod,

    /// Approved scopes.
    pub scopes: ScopeSet,

    /// Redirect URI the code was delivered to.
    pub redirect_uri: String,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizationCode {
    /// Returns `true` if the code has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}
