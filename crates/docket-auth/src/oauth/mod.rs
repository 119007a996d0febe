//! OAuth 2.1 authorization code flow.
//!
//! - [`registry`] - client lookup and RFC 7591 registration
//! - [`authorize`] - authorization request validation
//! - [`consent`] - login/consent redirects and the user's decision
//! - [`code`] - single-use authorization codes
//! - [`pkce`] - S256 challenge verification
//!
//! # Example
//!
//! ```ignore
//! use docket_auth::oauth::{AuthorizationRequestValidator, ClientRegistry};
//!
//! let registry = Arc::new(ClientRegistry::new(stores.clients.clone()));
//! let validator = AuthorizationRequestValidator::new(registry);
//! let validated = validator.validate(&params).await?;
//! ```

pub mod authorize;
pub mod code;
pub mod consent;
pub mod pkce;
pub mod registry;

pub use authorize::{AuthorizationParams, AuthorizationRequestValidator, ValidatedRequest};
pub use code::{AuthorizationCodeStore, IssueCode};
pub use consent::{
    AuthorizeOutcome, ConsentAction, ConsentCoordinator, ConsentForm, ConsentPages,
    login_redirect,
};
pub use pkce::{PkceChallenge, PkceChallengeMethod, PkceError};
pub use registry::{ClientMetadata, ClientRegistry, MAX_CLIENT_NAME_LENGTH, MAX_REDIRECT_URIS};
