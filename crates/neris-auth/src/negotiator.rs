//! Authentication state machine.
//!
//! States: `Unauthenticated`, `AwaitingChallenge`, `Authenticated`,
//! `Expired`. Expiry is detected lazily on every check; there is no timer.
//! Negotiations on one negotiator are serialized, and callers that waited
//! for the guard re-check validity before doing any work of their own. A
//! caller that queued behind a failed negotiation gets that failure instead
//! of negotiating again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use neris_settings::Grant;
use tokio::sync::{Mutex, OnceCell};

use crate::errors::{AuthError, PersistenceWarning};
use crate::provider::{IdentityProvider, ProviderResponse};
use crate::storage::TokenCache;
use crate::store::CredentialStore;
use crate::types::{AuthState, AuthStatus, Authorized, MfaChallenge, ProviderConfig, TokenSet};

/// Result of the most recent negotiation.
#[derive(Debug, Default)]
struct LastOutcome {
    generation: u64,
    /// `(status, message)` of the failure, if it failed.
    failure: Option<(u16, String)>,
}

/// Drives token acquisition, refresh, re-acquisition and MFA for one client.
pub struct Negotiator {
    grant: Grant,
    provider: Arc<dyn IdentityProvider>,
    store: CredentialStore,
    cache: Option<TokenCache>,
    provider_config: OnceCell<ProviderConfig>,
    guard: Mutex<()>,
    pending: parking_lot::Mutex<Option<MfaChallenge>>,
    last_outcome: parking_lot::Mutex<LastOutcome>,
    cache_restored: AtomicBool,
}

impl Negotiator {
    /// Negotiator for `grant` talking to `provider`.
    pub fn new(grant: Grant, provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            grant,
            provider,
            store: CredentialStore::new(),
            cache: None,
            provider_config: OnceCell::new(),
            guard: Mutex::new(()),
            pending: parking_lot::Mutex::new(None),
            last_outcome: parking_lot::Mutex::new(LastOutcome::default()),
            cache_restored: AtomicBool::new(false),
        }
    }

    /// Persist tokens to `cache`. Only the password grant reads or writes it.
    #[must_use]
    pub fn with_token_cache(mut self, cache: TokenCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The active grant.
    pub fn grant(&self) -> &Grant {
        &self.grant
    }

    /// The token cache, if enabled.
    pub fn token_cache(&self) -> Option<&TokenCache> {
        self.cache.as_ref()
    }

    /// Current state.
    pub fn state(&self) -> AuthState {
        if self.pending.lock().is_some() {
            return AuthState::AwaitingChallenge;
        }
        let tokens = self.store.get();
        if tokens.is_unauthenticated() {
            AuthState::Unauthenticated
        } else if tokens.is_valid(Utc::now()) {
            AuthState::Authenticated
        } else {
            AuthState::Expired
        }
    }

    /// Snapshot of the held token set.
    pub fn tokens(&self) -> TokenSet {
        self.store.get()
    }

    /// The pending MFA challenge, if any.
    pub fn pending_challenge(&self) -> Option<MfaChallenge> {
        self.pending.lock().clone()
    }

    /// Replace the held token set, e.g. with one obtained out of band.
    ///
    /// Drops any pending challenge.
    pub fn restore_session(&self, tokens: TokenSet) {
        self.store.set(tokens);
        *self.pending.lock() = None;
    }

    /// Return a usable access token, negotiating if needed.
    ///
    /// While a challenge is pending this fails with
    /// [`AuthError::ChallengeRequired`] and performs no requests. Callers
    /// that waited on a negotiation which failed get
    /// [`AuthError::Authentication`] with the same status and message.
    pub async fn ensure_authenticated(&self) -> Result<Authorized, AuthError> {
        let seen = self.last_outcome.lock().generation;
        if let Some(authorized) = self.check_usable()? {
            return Ok(authorized);
        }

        let _guard = self.guard.lock().await;
        if let Some(authorized) = self.check_usable()? {
            tracing::debug!("token refreshed by a concurrent caller");
            return Ok(authorized);
        }
        if let Some(err) = self.failure_since(seen) {
            tracing::debug!(error = %err, "concurrent negotiation failed");
            return Err(err);
        }

        match self.negotiate_recorded().await? {
            AuthStatus::Authenticated { warning } => Ok(Authorized {
                access_token: self.store.get().access_token,
                warning,
            }),
            AuthStatus::ChallengeRequired(challenge) => Err(AuthError::ChallengeRequired(challenge)),
        }
    }

    /// First phase of interactive authentication.
    ///
    /// Returns the pending challenge again if one is outstanding.
    pub async fn begin_auth(&self) -> Result<AuthStatus, AuthError> {
        let _guard = self.guard.lock().await;
        if let Some(challenge) = self.pending_challenge() {
            return Ok(AuthStatus::ChallengeRequired(challenge));
        }
        if self.store.is_valid(Utc::now()) {
            return Ok(AuthStatus::Authenticated { warning: None });
        }
        self.negotiate_recorded().await
    }

    /// Second phase: answer the pending challenge.
    ///
    /// A rejected code keeps the challenge pending so the caller can try
    /// again; nothing is retried automatically.
    #[tracing::instrument(skip_all)]
    pub async fn submit_challenge_response(&self, code: &str) -> Result<AuthStatus, AuthError> {
        let _guard = self.guard.lock().await;
        let Some(challenge) = self.pending_challenge() else {
            return Err(AuthError::NoPendingChallenge);
        };
        let config = self.provider_config().await?;

        let resp = self
            .provider
            .respond_to_challenge(config, &self.grant, &challenge, code)
            .await
            .inspect_err(|e| tracing::warn!(challenge = %challenge.name, error = %e, "challenge response rejected"))?;
        self.apply(config, resp, None)
    }

    /// Drop the pending challenge and start over on the next call.
    pub fn abandon_challenge(&self) {
        if self.pending.lock().take().is_some() && !self.store.is_valid(Utc::now()) {
            self.store.set(TokenSet::unauthenticated());
        }
    }

    fn check_usable(&self) -> Result<Option<Authorized>, AuthError> {
        if let Some(challenge) = self.pending_challenge() {
            return Err(AuthError::ChallengeRequired(challenge));
        }
        Ok(self
            .store
            .valid_access_token(Utc::now())
            .map(|access_token| Authorized {
                access_token,
                warning: None,
            }))
    }

    async fn provider_config(&self) -> Result<&ProviderConfig, AuthError> {
        self.provider_config
            .get_or_try_init(|| self.provider.provider_config())
            .await
    }

    /// Failure of a negotiation that finished after generation `seen`.
    fn failure_since(&self, seen: u64) -> Option<AuthError> {
        let outcome = self.last_outcome.lock();
        if outcome.generation == seen {
            return None;
        }
        outcome
            .failure
            .as_ref()
            .map(|(status, message)| AuthError::authentication(*status, message.clone()))
    }

    /// [`Self::negotiate`], remembering the outcome for queued callers.
    async fn negotiate_recorded(&self) -> Result<AuthStatus, AuthError> {
        let result = self.negotiate().await;
        let mut outcome = self.last_outcome.lock();
        outcome.generation = outcome.generation.wrapping_add(1);
        outcome.failure = result.as_ref().err().map(|e| match e {
            AuthError::Authentication { status, message } => (*status, message.clone()),
            other => (0, other.to_string()),
        });
        drop(outcome);
        result
    }

    /// Caller must hold the guard.
    #[tracing::instrument(skip_all, fields(grant = %self.grant.kind()))]
    async fn negotiate(&self) -> Result<AuthStatus, AuthError> {
        let config = self.provider_config().await?;
        self.restore_from_cache(config);

        let current = self.store.get();
        if current.is_valid(Utc::now()) {
            return Ok(AuthStatus::Authenticated { warning: None });
        }

        let mut refresh_failed = false;
        if current.has_refresh_token() {
            let refresh_token = current.refresh_token.as_str();
            match self.provider.refresh(config, &self.grant, refresh_token).await {
                Ok(resp) => {
                    tracing::info!("access token refreshed");
                    return self.apply(config, resp, Some(refresh_token));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "token refresh failed, re-acquiring");
                    refresh_failed = true;
                }
            }
        }

        let resp = self
            .provider
            .acquire(config, &self.grant)
            .await
            .map_err(|e| if refresh_failed { fallback_failure(e) } else { e })?;
        self.apply(config, resp, None)
    }

    fn apply(
        &self,
        config: &ProviderConfig,
        resp: ProviderResponse,
        retained_refresh: Option<&str>,
    ) -> Result<AuthStatus, AuthError> {
        match resp {
            ProviderResponse::Tokens(grant) => {
                let tokens = TokenSet::from_grant(grant, Utc::now(), retained_refresh);
                self.store.set(tokens.clone());
                *self.pending.lock() = None;
                tracing::info!(expires_at = %tokens.expires_at, "authenticated");

                let warning = self.persist(config, &tokens);
                Ok(AuthStatus::Authenticated { warning })
            }
            ProviderResponse::Challenge(challenge) => {
                *self.pending.lock() = Some(challenge.clone());
                Ok(AuthStatus::ChallengeRequired(challenge))
            }
        }
    }

    fn restore_from_cache(&self, config: &ProviderConfig) {
        if self.cache_restored.swap(true, Ordering::SeqCst) {
            return;
        }
        let (Some(cache), Some(subject)) = (&self.cache, self.grant.username()) else {
            return;
        };
        if !self.store.get().is_unauthenticated() {
            return;
        }
        if let Some(tokens) = cache.load_for(config, subject) {
            tracing::debug!(path = %cache.path().display(), "restored tokens from cache");
            self.store.set(tokens);
        }
    }

    fn persist(&self, config: &ProviderConfig, tokens: &TokenSet) -> Option<PersistenceWarning> {
        let (Some(cache), Some(subject)) = (&self.cache, self.grant.username()) else {
            return None;
        };
        match cache.save(config, subject, tokens) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(path = %cache.path().display(), error = %e, "token cache write failed");
                Some(PersistenceWarning {
                    path: cache.path().to_path_buf(),
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Refresh and re-acquisition both failed. Transport errors keep their type;
/// anything else the provider answered with is an authentication failure.
fn fallback_failure(err: AuthError) -> AuthError {
    match err {
        AuthError::Transport(_) | AuthError::Authentication { .. } => err,
        other => AuthError::authentication(0, format!("re-acquisition failed: {other}")),
    }
}

impl std::fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiator")
            .field("grant", &self.grant)
            .field("state", &self.state())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
