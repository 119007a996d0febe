//! Consent coordination.
//!
//! `GET /oauth/authorize` sends the browser to login or to the consent page;
//! the consent page answers with `POST /oauth/authorize`, which records the
//! user's decision and hands back the client redirect URL.

use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use crate::error::{AuthError, AuthResult};
use crate::oauth::authorize::{
    AuthorizationParams, AuthorizationRequestValidator, ValidatedRequest, require_pkce,
    require_registered_redirect, require_scopes,
};
use crate::oauth::code::{AuthorizationCodeStore, IssueCode};
use crate::sanitize::sanitize_free_text;
use crate::storage::SessionStore;
use crate::types::UserSession;

/// Maximum length of a `next` return path handed to the login page.
pub const MAX_RETURN_PATH_LENGTH: usize = 2000;

/// Maximum device name length, in characters.
pub const MAX_DEVICE_NAME_LENGTH: usize = 255;

/// Where the browser goes after `GET /oauth/authorize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    /// No valid session: go log in first.
    LoginRequired { location: String },
    /// Valid request: go to the consent page.
    ConsentRequired { location: String },
}

impl AuthorizeOutcome {
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::LoginRequired { location } | Self::ConsentRequired { location } => location,
        }
    }
}

/// Body of `POST /oauth/authorize`, submitted by the consent page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsentForm {
    pub action: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub device_name: Option<String>,
}

/// The user's answer on the consent page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentAction {
    Approve,
    Deny,
}

impl ConsentAction {
    fn parse(value: Option<&str>) -> AuthResult<Self> {
        match value {
            Some("approve") => Ok(Self::Approve),
            Some("deny") => Ok(Self::Deny),
            _ => Err(AuthError::invalid_request(
                "action must be \"approve\" or \"deny\"",
            )),
        }
    }
}

/// Page locations the coordinator redirects to.
#[derive(Debug, Clone)]
pub struct ConsentPages {
    pub login_path: String,
    pub consent_path: String,
}

/// Drives the login and consent steps of the authorization code flow.
pub struct ConsentCoordinator {
    sessions: Arc<dyn SessionStore>,
    validator: AuthorizationRequestValidator,
    codes: Arc<AuthorizationCodeStore>,
    pages: ConsentPages,
}

impl ConsentCoordinator {
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        validator: AuthorizationRequestValidator,
        codes: Arc<AuthorizationCodeStore>,
        pages: ConsentPages,
    ) -> Self {
        Self {
            sessions,
            validator,
            codes,
            pages,
        }
    }

    /// Handles `GET /oauth/authorize`.
    ///
    /// `return_to` is the path and query of the current request, offered to
    /// the login page as `next` when it is a safe local path.
    ///
    /// # Errors
    ///
    /// Returns the validator's error for an invalid request by a logged-in
    /// user, or `Storage` if the session lookup fails.
    pub async fn begin(
        &self,
        session_id: Option<&str>,
        return_to: &str,
        params: &AuthorizationParams,
    ) -> AuthResult<AuthorizeOutcome> {
        if self.resolve_session(session_id).await?.is_none() {
            return Ok(AuthorizeOutcome::LoginRequired {
                location: login_redirect(&self.pages.login_path, return_to),
            });
        }

        let validated = self.validator.validate(params).await?;

        tracing::debug!(
            client_id = %validated.client.client_id,
            scope = %validated.scopes,
            "Authorization request validated, awaiting consent"
        );

        Ok(AuthorizeOutcome::ConsentRequired {
            location: consent_redirect(&self.pages.consent_path, &validated),
        })
    }

    /// Handles `POST /oauth/authorize` and returns the client redirect URL.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` without a valid session
    /// - `InvalidClient` for a missing or unknown client
    /// - `InvalidRequest` for an unregistered redirect URI, an unknown
    ///   action, a bad device name or missing PKCE
    /// - `InvalidScope` if no supported scope was approved
    pub async fn decide(&self, session_id: Option<&str>, form: &ConsentForm) -> AuthResult<String> {
        let session = self
            .resolve_session(session_id)
            .await?
            .ok_or_else(|| AuthError::unauthorized("Authentication required"))?;
        self.decide_for(&session, form).await
    }

    /// [`decide`](Self::decide) for a session the caller already resolved.
    ///
    /// # Errors
    ///
    /// As `decide`, minus `Unauthorized`.
    pub async fn decide_for(&self, session: &UserSession, form: &ConsentForm) -> AuthResult<String> {
        let client = self
            .validator
            .resolve_client(form.client_id.as_deref())
            .await?;
        let redirect_uri = require_registered_redirect(&client, form.redirect_uri.as_deref())?;
        let state = form.state.as_deref();

        match ConsentAction::parse(form.action.as_deref())? {
            ConsentAction::Deny => {
                tracing::info!(
                    client_id = %client.client_id,
                    user_id = %session.user_id,
                    "Authorization denied by user"
                );
                append_query(&redirect_uri, &[("error", Some("access_denied")), ("state", state)])
            }
            ConsentAction::Approve => {
                let device_name = require_device_name(form.device_name.as_deref())?;
                let (challenge, method) = require_pkce(
                    form.code_challenge.as_deref(),
                    form.code_challenge_method.as_deref(),
                )?;
                let scopes = require_scopes(form.scope.as_deref())?;

                let code = self
                    .codes
                    .issue(IssueCode {
                        user_id: session.user_id.clone(),
                        client_id: client.client_id.clone(),
                        device_name,
                        code_challenge: challenge.as_str().to_string(),
                        code_challenge_method: method,
                        scopes,
                        redirect_uri: redirect_uri.clone(),
                    })
                    .await?;

                tracing::info!(
                    client_id = %client.client_id,
                    user_id = %session.user_id,
                    "Authorization approved by user"
                );

                append_query(&redirect_uri, &[("code", Some(code.as_str())), ("state", state)])
            }
        }
    }

    async fn resolve_session(&self, session_id: Option<&str>) -> AuthResult<Option<UserSession>> {
        match session_id {
            Some(id) if !id.is_empty() => self.sessions.get(id).await,
            _ => Ok(None),
        }
    }
}

/// Builds the login redirect, carrying `next` only for safe local paths.
#[must_use]
pub fn login_redirect(login_path: &str, return_to: &str) -> String {
    if !is_safe_return_path(return_to) {
        return login_path.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", return_to)
        .finish();
    with_query(login_path, &query)
}

/// Appends an encoded query to `path`, joining onto any query it already has.
fn with_query(path: &str, query: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{query}")
}

fn is_safe_return_path(path: &str) -> bool {
    path.starts_with("/oauth/") && path.len() <= MAX_RETURN_PATH_LENGTH
}

fn consent_redirect(consent_path: &str, request: &ValidatedRequest) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("client_id", &request.client.client_id);
    if let Some(name) = &request.client.name {
        query.append_pair("client_name", name);
    }
    query
        .append_pair("redirect_uri", &request.redirect_uri)
        .append_pair("scope", &request.scopes.to_string());
    if let Some(state) = &request.state {
        query.append_pair("state", state);
    }
    query
        .append_pair("code_challenge", request.code_challenge.as_str())
        .append_pair("code_challenge_method", request.code_challenge_method.as_str())
        .append_pair("response_type", "code");
    with_query(consent_path, &query.finish())
}

fn require_device_name(device_name: Option<&str>) -> AuthResult<String> {
    let trimmed = device_name.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(AuthError::invalid_request("device_name is required"));
    }
    if trimmed.chars().count() > MAX_DEVICE_NAME_LENGTH {
        return Err(AuthError::invalid_request(format!(
            "device_name must be at most {MAX_DEVICE_NAME_LENGTH} characters"
        )));
    }
    let sanitized = sanitize_free_text(trimmed);
    if sanitized.is_empty() {
        return Err(AuthError::invalid_request("device_name is required"));
    }
    Ok(sanitized)
}

fn append_query(redirect_uri: &str, params: &[(&str, Option<&str>)]) -> AuthResult<String> {
    let mut url = Url::parse(redirect_uri)
        .map_err(|_| AuthError::invalid_request("redirect_uri not allowed"))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in params {
            if let Some(value) = value {
                pairs.append_pair(name, value);
            }
        }
    }
    Ok(url.into())
}
