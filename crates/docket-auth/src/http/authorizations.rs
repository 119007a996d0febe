//! Consent history API: list and revoke the caller's authorizations.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::OAuthState;
use super::extract::require_session;
use crate::error::{AuthError, AuthResult};
use crate::types::ScopeSet;

/// One active authorization as shown to its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationSummary {
    pub id: Uuid,
    pub client_id: String,
    pub client_name: Option<String>,
    pub device_name: String,
    pub scopes: ScopeSet,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// Handler for `GET /api/oauth/authorizations`.
pub async fn list_authorizations_handler(
    State(state): State<OAuthState>,
    jar: CookieJar,
) -> AuthResult<Json<Vec<AuthorizationSummary>>> {
    let session = require_session(&state, &jar).await?;
    let now = OffsetDateTime::now_utc();

    let grants = state.grants.list_by_user(&session.user_id).await?;
    let mut client_names: HashMap<String, Option<String>> = HashMap::new();
    let mut summaries = Vec::with_capacity(grants.len());

    for grant in grants.into_iter().filter(|g| !g.is_expired_at(now)) {
        let client_name = match client_names.get(&grant.client_id) {
            Some(name) => name.clone(),
            None => {
                let name = state
                    .registry
                    .lookup(&grant.client_id)
                    .await?
                    .and_then(|client| client.name);
                client_names.insert(grant.client_id.clone(), name.clone());
                name
            }
        };

        summaries.push(AuthorizationSummary {
            id: grant.id,
            client_id: grant.client_id,
            client_name,
            device_name: grant.device_name,
            scopes: grant.scopes,
            created_at: grant.created_at,
            expires_at: grant.expires_at,
        });
    }

    Ok(Json(summaries))
}

/// Handler for `DELETE /api/oauth/authorizations/{id}`.
///
/// Someone else's grant is reported exactly like a missing one.
pub async fn delete_authorization_handler(
    State(state): State<OAuthState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> AuthResult<StatusCode> {
    let session = require_session(&state, &jar).await?;

    let not_found = || AuthError::not_found("Authorization not found");
    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;

    if state.grants.delete_for_user(id, &session.user_id).await? {
        tracing::info!(grant_id = %id, user_id = %session.user_id, "Authorization revoked by owner");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}
