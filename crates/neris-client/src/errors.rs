//! Client error types.

use neris_auth::AuthError;
use neris_settings::SettingsError;

/// Errors that abort a gateway call.
///
/// Non-2xx responses from the API are not errors; they resolve to
/// [`CallOutcome::Failure`](crate::CallOutcome::Failure).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Authentication failed or needs an MFA code.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The client could not be built from its configuration.
    #[error("configuration error: {0}")]
    Configuration(#[from] SettingsError),

    /// Network-level failure reaching the API.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request body does not match the declared model.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl ClientError {
    /// The pending MFA challenge, if this call stopped on one.
    pub fn challenge(&self) -> Option<&neris_auth::MfaChallenge> {
        match self {
            Self::Auth(AuthError::ChallengeRequired(challenge)) => Some(challenge),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
