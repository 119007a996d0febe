//! Request extraction helpers.

use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use axum_extra::extract::CookieJar;
use serde::de::DeserializeOwned;

use super::OAuthState;
use crate::error::{AuthError, AuthResult};
use crate::types::UserSession;

/// Body extractor accepting `application/json` or
/// `application/x-www-form-urlencoded`.
///
/// Any other content type is parsed as a form, which rejects it.
/// Rejections are OAuth `invalid_request` errors.
#[derive(Debug, Clone)]
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim_start().starts_with("application/json"));

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|_| AuthError::invalid_request("Malformed JSON request body"))?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|_| AuthError::invalid_request("Malformed form request body"))?;
            Ok(Self(value))
        }
    }
}

/// Reads the login session ID from the configured cookie.
#[must_use]
pub fn session_id(state: &OAuthState, jar: &CookieJar) -> Option<String> {
    jar.get(&state.config.session_cookie)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Resolves the caller's session or fails with `Unauthorized`.
///
/// # Errors
///
/// Returns `Unauthorized` without a valid session and `Storage` if the
/// session lookup fails.
pub async fn require_session(state: &OAuthState, jar: &CookieJar) -> AuthResult<UserSession> {
    let Some(id) = session_id(state, jar) else {
        return Err(AuthError::unauthorized("Authentication required"));
    };
    state
        .sessions
        .get(&id)
        .await?
        .ok_or_else(|| AuthError::unauthorized("Authentication required"))
}
