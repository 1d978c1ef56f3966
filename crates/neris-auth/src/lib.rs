//! # neris-auth
//!
//! Token lifecycle for the NERIS API.
//!
//! The [`Negotiator`] owns one client's [`TokenSet`] (through a
//! [`CredentialStore`]) and decides, on every check, whether the held token
//! is usable or must be refreshed, re-acquired, or completed through an MFA
//! challenge. Wire exchanges go through an [`IdentityProvider`];
//! [`TokenEndpointProvider`] posts form-encoded grants to `{base_url}/token`.
//!
//! Interactive (password) sessions can be persisted to `~/.neris/tokens.json`
//! with a [`TokenCache`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use neris_auth::{Negotiator, TokenEndpointProvider};
//! use neris_settings::{CredentialConfig, Grant};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let grant = Grant::client_credentials("id1", "secret1")?;
//! let config = CredentialConfig::new("https://api.neris.fsri.org/v1", grant.clone());
//! let provider = TokenEndpointProvider::new(reqwest::Client::new(), &config);
//! let negotiator = Negotiator::new(grant, Arc::new(provider));
//! let authorized = negotiator.ensure_authenticated().await?;
//! # let _ = authorized;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod endpoint;
pub mod errors;
pub mod negotiator;
pub mod provider;
pub mod redact;
pub mod storage;
pub mod store;
pub mod types;

pub use endpoint::TokenEndpointProvider;
pub use errors::{AuthError, PersistenceWarning};
pub use negotiator::Negotiator;
pub use provider::{IdentityProvider, ProviderResponse};
pub use storage::TokenCache;
pub use store::CredentialStore;
pub use types::{
    AuthState, AuthStatus, Authorized, MfaChallenge, ProviderConfig, TokenGrant, TokenSet,
};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
