//! Identity-provider adapter seam.
//!
//! The [`Negotiator`](crate::Negotiator) owns the state machine and every
//! edge-case rule; an [`IdentityProvider`] only performs wire exchanges.

use async_trait::async_trait;
use neris_settings::Grant;

use crate::errors::AuthError;
use crate::types::{MfaChallenge, ProviderConfig, TokenGrant};

/// What the identity provider answered to one exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderResponse {
    /// Tokens were issued.
    Tokens(TokenGrant),
    /// An MFA code is required before tokens are issued.
    Challenge(MfaChallenge),
}

/// Performs token exchanges against one identity provider.
///
/// Rejections are reported as [`AuthError::Authentication`]; network
/// failures as [`AuthError::Transport`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the provider's configuration. Called once per negotiator.
    async fn provider_config(&self) -> Result<ProviderConfig, AuthError>;

    /// Initial acquisition with the grant's own credentials.
    async fn acquire(
        &self,
        config: &ProviderConfig,
        grant: &Grant,
    ) -> Result<ProviderResponse, AuthError>;

    /// Refresh-grant exchange.
    async fn refresh(
        &self,
        config: &ProviderConfig,
        grant: &Grant,
        refresh_token: &str,
    ) -> Result<ProviderResponse, AuthError>;

    /// Answer a pending MFA challenge with the user's code.
    async fn respond_to_challenge(
        &self,
        config: &ProviderConfig,
        grant: &Grant,
        challenge: &MfaChallenge,
        code: &str,
    ) -> Result<ProviderResponse, AuthError>;
}
