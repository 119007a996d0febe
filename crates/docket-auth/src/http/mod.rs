//! Axum HTTP handlers for the OAuth endpoints.
//!
//! # Available Handlers
//!
//! - [`discovery`] - RFC 8414 / RFC 9728 metadata documents
//! - [`authorize`] - authorization endpoint (redirect and consent decision)
//! - [`token`] - token endpoint
//! - [`revoke`] - token revocation endpoint (RFC 7009)
//! - [`register`] - dynamic client registration (RFC 7591)
//! - [`authorizations`] - the caller's consent history
//!
//! # Usage
//!
//! ```ignore
//! let state = OAuthState::new(stores, config);
//! let app = oauth_router(state);
//! ```

pub mod authorizations;
pub mod authorize;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod register;
pub mod revoke;
pub mod token;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};

use crate::config::{AuthConfig, lifetime};
use crate::oauth::{
    AuthorizationCodeStore, AuthorizationRequestValidator, ClientRegistry, ConsentCoordinator,
    ConsentPages,
};
use crate::storage::{AuthStores, SessionStore, TokenGrantStorage};
use crate::token::{RevocationService, TokenConfig, TokenService};

pub use authorizations::{
    AuthorizationSummary, delete_authorization_handler, list_authorizations_handler,
};
pub use authorize::{ConsentResponse, authorize_handler, consent_handler};
pub use discovery::{
    AuthorizationServerMetadata, ProtectedResourceMetadata,
    authorization_server_metadata_handler, issuer_from_headers,
    protected_resource_metadata_handler,
};
pub use error::ErrorBody;
pub use extract::JsonOrForm;
pub use register::{ClientRegistrationResponse, register_handler};
pub use revoke::{RevocationForm, revoke_handler};
pub use token::token_handler;

/// Shared state for every OAuth handler.
#[derive(Clone)]
pub struct OAuthState {
    pub registry: Arc<ClientRegistry>,
    pub consent: Arc<ConsentCoordinator>,
    pub tokens: Arc<TokenService>,
    pub revocation: Arc<RevocationService>,
    pub grants: Arc<dyn TokenGrantStorage>,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Arc<AuthConfig>,
}

impl OAuthState {
    /// Wires the authorization server components over `stores`.
    #[must_use]
    pub fn new(stores: AuthStores, config: AuthConfig) -> Self {
        let registry = Arc::new(ClientRegistry::new(stores.clients.clone()));
        let codes = Arc::new(AuthorizationCodeStore::new(
            stores.codes.clone(),
            lifetime(config.authorization_code_lifetime),
        ));
        let consent = Arc::new(ConsentCoordinator::new(
            stores.sessions.clone(),
            AuthorizationRequestValidator::new(registry.clone()),
            codes.clone(),
            ConsentPages {
                login_path: config.login_path.clone(),
                consent_path: config.consent_path.clone(),
            },
        ));
        let tokens = Arc::new(TokenService::new(
            codes,
            stores.grants.clone(),
            TokenConfig {
                access_token_lifetime: lifetime(config.access_token_lifetime),
                refresh_token_lifetime: lifetime(config.refresh_token_lifetime),
            },
        ));
        let revocation = Arc::new(RevocationService::new(stores.grants.clone()));

        Self {
            registry,
            consent,
            tokens,
            revocation,
            grants: stores.grants,
            sessions: stores.sessions,
            config: Arc::new(config),
        }
    }
}

/// Builds the router for every OAuth endpoint.
///
/// `/oauth/register` is only mounted when dynamic registration is enabled.
pub fn oauth_router(state: OAuthState) -> Router {
    let mut router = Router::new()
        .route(
            "/.well-known/oauth-authorization-server",
            get(authorization_server_metadata_handler),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(protected_resource_metadata_handler),
        )
        .route(
            "/oauth/authorize",
            get(authorize_handler).post(consent_handler),
        )
        .route("/oauth/token", post(token_handler))
        .route("/oauth/revoke", post(revoke_handler))
        .route("/api/oauth/authorizations", get(list_authorizations_handler))
        .route(
            "/api/oauth/authorizations/{id}",
            delete(delete_authorization_handler),
        );

    if state.config.dynamic_registration_enabled {
        router = router.route("/oauth/register", post(register_handler));
    }

    router.with_state(state)
}
