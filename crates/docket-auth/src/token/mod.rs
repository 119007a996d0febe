//! Token issuance, rotation and revocation.

pub mod revocation;
pub mod service;

pub use revocation::{RevocationService, TokenTypeHint};
pub use service::{TokenConfig, TokenRequest, TokenResponse, TokenService};
