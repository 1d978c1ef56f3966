//! Auth error types.

use std::path::PathBuf;

use crate::types::MfaChallenge;

/// Errors that can occur while negotiating or persisting credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The identity provider rejected the request, or refresh and
    /// re-acquisition both failed.
    #[error("authentication failed ({status}): {message}")]
    Authentication {
        /// HTTP status code (0 if no response).
        status: u16,
        /// Response body or error description.
        message: String,
    },

    /// The provider requires an MFA code before issuing tokens.
    ///
    /// Not a failure: resolve it with
    /// [`Negotiator::submit_challenge_response`](crate::Negotiator::submit_challenge_response).
    #[error("MFA challenge required: {}", .0.name)]
    ChallengeRequired(MfaChallenge),

    /// A challenge response was submitted with no challenge pending.
    #[error("no MFA challenge is pending")]
    NoPendingChallenge,

    /// The active grant cannot answer the provider's challenge.
    #[error("cannot answer challenge `{0}` without a username")]
    UnsupportedChallenge(String),

    /// The identity provider returned a success status with an unusable body.
    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    /// Network-level failure reaching the identity provider.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Build an [`AuthError::Authentication`].
    pub fn authentication(status: u16, message: impl Into<String>) -> Self {
        Self::Authentication {
            status,
            message: message.into(),
        }
    }

    /// Whether the provider rejected the credentials.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

/// A token cache write failed.
///
/// Never fatal: the in-memory token set stays authoritative.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("token cache write to {} failed: {message}", path.display())]
pub struct PersistenceWarning {
    /// Cache file that could not be written.
    pub path: PathBuf,
    /// Underlying error.
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
