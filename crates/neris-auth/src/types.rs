//! Core authentication types.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PersistenceWarning;

/// One authenticated session: access token, refresh token and the real
/// expiry reported by the identity provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    /// Bearer token for API requests.
    pub access_token: String,
    /// Token for the refresh grant. Empty when the provider issued none.
    pub refresh_token: String,
    /// Absolute expiry of `access_token`.
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    /// Sentinel held by a client that has never authenticated.
    ///
    /// Expires at the lowest representable instant so the first check
    /// always triggers acquisition.
    pub fn unauthenticated() -> Self {
        Self {
            access_token: String::new(),
            refresh_token: String::new(),
            expires_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Build from a token endpoint grant received at `now`.
    ///
    /// When the provider does not rotate refresh tokens, `retained_refresh`
    /// is kept.
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>, retained_refresh: Option<&str>) -> Self {
        let refresh_token = grant
            .refresh_token
            .filter(|rt| !rt.is_empty())
            .or_else(|| retained_refresh.map(str::to_string))
            .unwrap_or_default();

        Self {
            access_token: grant.access_token,
            refresh_token,
            expires_at: expires_at(now, grant.expires_in),
        }
    }

    /// Whether the access token is usable at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Whether a refresh grant can be attempted.
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Whether this is the never-authenticated sentinel.
    pub fn is_unauthenticated(&self) -> bool {
        self.access_token.is_empty()
    }
}

impl Default for TokenSet {
    fn default() -> Self {
        Self::unauthenticated()
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &mask(&self.access_token))
            .field("refresh_token", &mask(&self.refresh_token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn mask(token: &str) -> &'static str {
    if token.is_empty() { "" } else { crate::redact::MASK }
}

/// `now + expires_in`, saturating at the representable range.
pub fn expires_at(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    TimeDelta::try_seconds(expires_in)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(if expires_in < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Successful token endpoint payload.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    /// Issued access token.
    pub access_token: String,
    /// Issued refresh token, if the provider rotates or issues one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &mask(&self.access_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(mask))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// An in-progress MFA challenge. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct MfaChallenge {
    /// Provider-defined challenge name (e.g. `SMS_MFA`).
    pub name: String,
    /// Opaque session token echoed back with the response code.
    pub session: String,
    /// Text to show the user.
    pub prompt: String,
}

impl MfaChallenge {
    /// Create a challenge, defaulting the prompt from its name.
    pub fn new(name: impl Into<String>, session: impl Into<String>, prompt: Option<String>) -> Self {
        let name = name.into();
        let prompt = prompt
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| format!("Provide MFA code for {name}"));
        Self {
            name,
            session: session.into(),
            prompt,
        }
    }
}

impl fmt::Debug for MfaChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MfaChallenge")
            .field("name", &self.name)
            .field("session", &mask(&self.session))
            .field("prompt", &self.prompt)
            .finish()
    }
}

/// What the negotiator needs to reach the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Token endpoint URL.
    pub token_url: String,
    /// Client id, for adapters that need one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Negotiator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    /// No token has been acquired.
    Unauthenticated,
    /// Waiting for the caller to submit an MFA code.
    AwaitingChallenge,
    /// Holding a usable token.
    Authenticated,
    /// Holding a token past its expiry.
    Expired,
}

/// Outcome of one negotiation phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthStatus {
    /// A valid token is held.
    Authenticated {
        /// Set when the token could not be written to the cache.
        warning: Option<PersistenceWarning>,
    },
    /// The provider wants an MFA code.
    ChallengeRequired(MfaChallenge),
}

/// A usable access token, handed to the gateway for attachment.
#[derive(Clone)]
pub struct Authorized {
    /// Bearer token.
    pub access_token: String,
    /// Set when this call's negotiation could not update the cache.
    pub warning: Option<PersistenceWarning>,
}

impl fmt::Debug for Authorized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorized")
            .field("access_token", &mask(&self.access_token))
            .field("warning", &self.warning)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
