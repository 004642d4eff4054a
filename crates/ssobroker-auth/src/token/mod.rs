//! Access token signing.

pub mod jwt;

pub use jwt::{JwtTokenSigner, SignerError, SigningAlgorithm};

use crate::types::TokenClaims;

/// Produces signed access tokens from claims.
pub trait TokenSigner: Send + Sync {
    /// Signs `claims` into a compact token string.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be encoded or signed.
    fn sign(&self, claims: &TokenClaims) -> Result<String, SignerError>;
}
