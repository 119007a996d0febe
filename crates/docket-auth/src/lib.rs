//! # docket-auth
//!
//! OAuth 2.1 authorization server for Docket.
//!
//! This crate provides:
//! - Dynamic client registration (RFC 7591) for public clients
//! - Authorization code flow with mandatory PKCE (S256 only)
//! - Login and consent redirects driven by the login subsystem's sessions
//! - Opaque bearer tokens stored as SHA-256 hashes, with refresh rotation
//! - Token revocation (RFC 7009) and a per-user consent history API
//! - Discovery documents (RFC 8414, RFC 9728)
//!
//! ## Modules
//!
//! - [`config`] - Authorization server configuration
//! - [`oauth`] - Client registry, request validation, consent, codes, PKCE
//! - [`token`] - Code exchange, refresh rotation and revocation
//! - [`storage`] - Storage traits and the in-memory backend
//! - [`http`] - Axum HTTP handlers for the OAuth endpoints
//! - [`types`] - Shared domain types

pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod sanitize;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, AuthResult, ErrorCategory};
pub use http::{OAuthState, oauth_router};
pub use oauth::{
    AuthorizationCodeStore, AuthorizationRequestValidator, ClientRegistry, ConsentCoordinator,
};
pub use storage::{AuthStores, MemoryStorage};
pub use token::{RevocationService, TokenService};
pub use types::{OAuthClient, Scope, ScopeSet, TokenGrant};
