//! Domain types shared by the authorization server components.

pub mod client;
pub mod code;
pub mod grant;
pub mod scope;

pub use client::{GrantType, OAuthClient, ResponseType, TokenEndpointAuthMethod};
pub use code::AuthorizationCode;
pub use grant::{GrantRotation, TokenGrant, UserSession, generate_token, hash_token};
pub use scope::{Scope, ScopeSet};
