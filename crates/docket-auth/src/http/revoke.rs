//! Token revocation endpoint handler (RFC 7009).
//!
//! # Response
//!
//! Always `200 {}` once a `token` parameter is present, whether or not the
//! token was known.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::OAuthState;
use super::extract::JsonOrForm;
use crate::error::AuthError;
use crate::token::TokenTypeHint;

/// Revocation request parameters.
#[derive(Debug, Default, Deserialize)]
pub struct RevocationForm {
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub token_type_hint: Option<String>,
}

/// Handler for `POST /oauth/revoke`.
pub async fn revoke_handler(
    State(state): State<OAuthState>,
    JsonOrForm(form): JsonOrForm<RevocationForm>,
) -> Response {
    let Some(token) = form.token.filter(|t| !t.is_empty()) else {
        return AuthError::invalid_request("token is required").into_response();
    };

    let hint = form.token_type_hint.as_deref().and_then(TokenTypeHint::parse);
    state.revocation.revoke(&token, hint).await;

    Json(serde_json::json!({})).into_response()
}
