//! PKCE (Proof Key for Code Exchange), RFC 7636.
//!
//! Only the S256 method is accepted. `plain` is rejected everywhere a method
//! is parsed.
//!
//! # Example
//!
//! ```
//! use docket_auth::oauth::{PkceChallenge, PkceChallengeMethod};
//!
//! let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
//! let challenge = PkceChallenge::from_verifier(verifier);
//! assert_eq!(challenge.as_str(), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
//!
//! assert_eq!(PkceChallengeMethod::parse("S256").ok(), Some(PkceChallengeMethod::S256));
//! assert!(PkceChallengeMethod::parse("plain").is_err());
//! assert!(challenge.verify(verifier).is_ok());
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Errors that can occur during PKCE operations.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Challenge is missing or empty.
    #[error("code_challenge is required")]
    MissingChallenge,

    /// Unsupported challenge method (only S256 is supported).
    #[error("Unsupported challenge method: {0}. Only S256 is supported.")]
    UnsupportedMethod(String),

    /// Verifier does not hash to the stored challenge.
    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

/// PKCE challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PkceChallengeMethod {
    /// SHA-256 hash, the only supported method.
    #[default]
    S256,
}

impl PkceChallengeMethod {
    /// Parse a challenge method.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything but `"S256"`,
    /// including `"plain"`.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            other => Err(PkceError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Get the method as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
        }
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// PKCE code challenge: `BASE64URL(SHA256(ASCII(code_verifier)))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Wrap a challenge received from a client.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::MissingChallenge` if the challenge is empty.
    pub fn new(challenge: impl Into<String>) -> Result<Self, PkceError> {
        let challenge = challenge.into();
        if challenge.is_empty() {
            return Err(PkceError::MissingChallenge);
        }
        Ok(Self(challenge))
    }

    /// Derive the S256 challenge for a verifier.
    #[must_use]
    pub fn from_verifier(verifier: &str) -> Self {
        let hash = Sha256::digest(verifier.as_bytes());
        Self(URL_SAFE_NO_PAD.encode(hash))
    }

    /// Verify that a verifier hashes to this challenge.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::VerificationFailed` on mismatch.
    pub fn verify(&self, verifier: &str) -> Result<(), PkceError> {
        let expected = Self::from_verifier(verifier);
        if constant_time_eq(self.0.as_bytes(), expected.0.as_bytes()) {
            Ok(())
        } else {
            Err(PkceError::VerificationFailed)
        }
    }

    /// Get the challenge as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
