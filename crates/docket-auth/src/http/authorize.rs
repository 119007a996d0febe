//! Authorization endpoint handlers.
//!
//! - `GET /oauth/authorize` redirects to login or to the consent page
//! - `POST /oauth/authorize` records the consent decision

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{OriginalUri, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use super::OAuthState;
use super::extract::{JsonOrForm, require_session, session_id};
use crate::error::AuthError;
use crate::oauth::{AuthorizationParams, ConsentForm};

/// Response body of `POST /oauth/authorize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentResponse {
    pub redirect_url: String,
}

/// Handler for `GET /oauth/authorize`.
pub async fn authorize_handler(
    State(state): State<OAuthState>,
    jar: CookieJar,
    OriginalUri(uri): OriginalUri,
    params: Result<Query<AuthorizationParams>, QueryRejection>,
) -> Response {
    let Ok(Query(params)) = params else {
        return AuthError::invalid_request("Malformed authorization request").into_response();
    };

    tracing::debug!(client_id = ?params.client_id, "Processing authorization request");

    let return_to = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let session = session_id(&state, &jar);

    match state.consent.begin(session.as_deref(), return_to, &params).await {
        Ok(outcome) => found(outcome.location()),
        Err(e) => e.into_response(),
    }
}

/// Handler for `POST /oauth/authorize`.
///
/// The session is checked before the body is looked at, so an anonymous
/// caller always gets 401.
pub async fn consent_handler(
    State(state): State<OAuthState>,
    jar: CookieJar,
    form: Result<JsonOrForm<ConsentForm>, AuthError>,
) -> Response {
    let session = match require_session(&state, &jar).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };
    let JsonOrForm(form) = match form {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    match state.consent.decide_for(&session, &form).await {
        Ok(redirect_url) => (
            [(header::CACHE_CONTROL, "no-store")],
            Json(ConsentResponse { redirect_url }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

fn found(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, location.to_string()),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
    )
        .into_response()
}
