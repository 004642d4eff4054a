//! # ssobroker-auth
//!
//! Code exchange engine for the ssobroker single sign-on broker.
//!
//! This crate provides:
//! - Single-use, application-scoped authorization codes
//! - Refresh code rotation with signed access tokens
//! - Time-bounded logout marks that close refreshes
//! - A static Argon2 user directory for the identity seam
//!
//! ## Overview
//!
//! A user signs in once through the broker. Each application receives a code
//! it redeems for an access token and a fresh refresh code. Every redemption
//! consumes the presented code, so a code can be used at most once even when
//! several requests race. Logging out writes a mark that refuses further
//! refreshes for that user across all applications.
//!
//! ## Modules
//!
//! - [`config`] - Lifetimes, signing and store configuration
//! - [`exchange`] - The [`TokenExchanger`] flows
//! - [`issuer`] - Code issuance and single-use redemption
//! - [`revocation`] - Logout marks
//! - [`identity`] - Credential verification seam and static directory
//! - [`token`] - Access token signing
//! - [`code`] - Code value generation
//! - [`password`] - Argon2 password hashing
//!
//! ## Example
//!
//! ```ignore
//! let exchanger = TokenExchanger::new(store, generator, verifier, signer, policy);
//!
//! let tokens = exchanger.login_api("app1", "admin", "admin").await?;
//! let rotated = exchanger.refresh("app1", &tokens.refresh_code).await?;
//! exchanger.logout(1).await?;
//! ```

pub mod code;
pub mod config;
pub mod error;
pub mod exchange;
pub mod identity;
pub mod issuer;
pub mod password;
pub mod revocation;
pub mod token;
pub mod types;

pub use code::{UniqueCodeGenerator, UuidV7CodeGenerator};
pub use config::{BrokerConfig, ConfigError, SessionPolicy, SigningConfig, StoreConfig};
pub use error::{ErrorCategory, ExchangeError};
pub use exchange::TokenExchanger;
pub use identity::{IdentityError, IdentityVerifier, StaticIdentityVerifier, UserRecord};
pub use issuer::CodeIssuer;
pub use revocation::RevocationRegistry;
pub use token::{JwtTokenSigner, SignerError, SigningAlgorithm, TokenSigner};
pub use types::{IssuedTokens, LoginCode, TokenClaims, User, UserId};

/// Type alias for exchange results.
pub type ExchangeResult<T> = Result<T, ExchangeError>;
