//! Token endpoint handler.
//!
//! # Request Format
//!
//! ```text
//! POST /oauth/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=authorization_code&code=...&code_verifier=...&redirect_uri=...
//! ```

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use super::OAuthState;
use super::extract::JsonOrForm;
use crate::token::{TokenRequest, TokenResponse};

/// Handler for `POST /oauth/token`.
pub async fn token_handler(
    State(state): State<OAuthState>,
    JsonOrForm(request): JsonOrForm<TokenRequest>,
) -> Response {
    tracing::debug!(
        grant_type = ?request.grant_type,
        client_id = ?request.client_id,
        "Processing token request"
    );

    match state.tokens.handle(&request).await {
        Ok(response) => token_success_response(response),
        Err(e) => e.into_response(),
    }
}

fn token_success_response(response: TokenResponse) -> Response {
    (
        StatusCode::OK,
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(response),
    )
        .into_response()
}
