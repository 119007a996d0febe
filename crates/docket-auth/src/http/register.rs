//! Dynamic client registration endpoint (RFC 7591).

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::OAuthState;
use crate::error::AuthError;
use crate::oauth::ClientMetadata;
use crate::types::{GrantType, OAuthClient, ResponseType, TokenEndpointAuthMethod};

/// Client information response (RFC 7591 section 3.2.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegistrationResponse {
    pub client_id: String,
    /// Unix seconds.
    pub client_id_issued_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<GrantType>,
    pub response_types: Vec<ResponseType>,
    pub token_endpoint_auth_method: TokenEndpointAuthMethod,
}

impl From<OAuthClient> for ClientRegistrationResponse {
    fn from(client: OAuthClient) -> Self {
        Self {
            client_id: client.client_id,
            client_id_issued_at: client.issued_at.unix_timestamp(),
            client_name: client.name,
            redirect_uris: client.redirect_uris,
            grant_types: client.grant_types,
            response_types: client.response_types,
            token_endpoint_auth_method: client.auth_method,
        }
    }
}

/// Handler for `POST /oauth/register`.
///
/// The body is parsed by hand so a malformed document is reported as
/// `invalid_client_metadata` rather than a generic rejection.
pub async fn register_handler(State(state): State<OAuthState>, body: Bytes) -> Response {
    let metadata: ClientMetadata = match serde_json::from_slice(&body) {
        Ok(metadata) => metadata,
        Err(_) => {
            return AuthError::invalid_client_metadata("Request body must be a JSON object")
                .into_response();
        }
    };

    match state.registry.register(metadata).await {
        Ok(client) => (
            StatusCode::CREATED,
            [
                (header::CACHE_CONTROL, "no-store"),
                (header::PRAGMA, "no-cache"),
            ],
            Json(ClientRegistrationResponse::from(client)),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
