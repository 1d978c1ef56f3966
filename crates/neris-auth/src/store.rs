//! In-memory credential store.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::types::TokenSet;

/// Holds the client's current [`TokenSet`].
///
/// One store per client. The negotiator is its only writer and always
/// replaces the whole set.
#[derive(Debug, Default)]
pub struct CredentialStore {
    tokens: RwLock<TokenSet>,
}

impl CredentialStore {
    /// Create a store holding the unauthenticated sentinel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current token set.
    pub fn get(&self) -> TokenSet {
        self.tokens.read().clone()
    }

    /// Replace the token set.
    pub fn set(&self, tokens: TokenSet) {
        *self.tokens.write() = tokens;
    }

    /// Whether the held access token is usable at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.tokens.read().is_valid(now)
    }

    /// The access token, if usable at `now`.
    pub fn valid_access_token(&self, now: DateTime<Utc>) -> Option<String> {
        let tokens = self.tokens.read();
        tokens.is_valid(now).then(|| tokens.access_token.clone())
    }
}
