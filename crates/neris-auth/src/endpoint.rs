//! Form-encoded OAuth-style token endpoint adapter.
//!
//! Talks to `POST {base_url}/token`:
//! - 200 with `access_token`, `refresh_token` (optional) and `expires_in`
//! - 202 with `challenge_name`, `session` and an optional `prompt`
//! - anything else is a rejection

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use neris_settings::{CredentialConfig, Grant};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::errors::AuthError;
use crate::provider::{IdentityProvider, ProviderResponse};
use crate::redact::redact_json;
use crate::types::{MfaChallenge, ProviderConfig, TokenGrant};

/// Token endpoint path under the base URL.
const TOKEN_PATH: &str = "/token";

/// 202 payload.
#[derive(Deserialize)]
struct ChallengeBody {
    challenge_name: String,
    session: String,
    #[serde(default)]
    prompt: Option<String>,
}

/// The shipped [`IdentityProvider`]: reqwest against the API's own
/// token endpoint.
#[derive(Clone, Debug)]
pub struct TokenEndpointProvider {
    http: reqwest::Client,
    base_url: String,
    client_id: Option<String>,
    debug: bool,
}

impl TokenEndpointProvider {
    /// Adapter for `config`, sharing the caller's HTTP client.
    pub fn new(http: reqwest::Client, config: &CredentialConfig) -> Self {
        let client_id = match &config.grant {
            Some(Grant::ClientCredentials { client_id, .. }) => Some(client_id.clone()),
            _ => None,
        };
        Self {
            http,
            base_url: config.base_url.clone(),
            client_id,
            debug: config.debug,
        }
    }

    #[tracing::instrument(skip_all)]
    async fn exchange(
        &self,
        config: &ProviderConfig,
        form: &[(&str, &str)],
        basic: Option<String>,
    ) -> Result<ProviderResponse, AuthError> {
        let mut request = self.http.post(&config.token_url).form(form);
        if let Some(credentials) = &basic {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Basic {credentials}"));
        }

        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if self.debug {
            log_exchange(config, form, status, &text);
        }

        match status {
            StatusCode::ACCEPTED => {
                let body: ChallengeBody = serde_json::from_str(&text)
                    .map_err(|e| AuthError::MalformedResponse(format!("challenge: {e}")))?;
                tracing::info!(challenge = %body.challenge_name, "identity provider requires MFA");
                Ok(ProviderResponse::Challenge(MfaChallenge::new(
                    body.challenge_name,
                    body.session,
                    body.prompt,
                )))
            }
            s if s.is_success() => {
                let grant: TokenGrant = serde_json::from_str(&text)
                    .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
                Ok(ProviderResponse::Tokens(grant))
            }
            s => Err(AuthError::authentication(s.as_u16(), text)),
        }
    }
}

fn log_exchange(
    config: &ProviderConfig,
    form: &[(&str, &str)],
    status: StatusCode,
    text: &str,
) {
    let mut body: serde_json::Value = serde_json::from_str(text)
        .unwrap_or_else(|_| serde_json::Value::String(text.to_string()));
    redact_json(&mut body);

    // Form values carry secrets; only the grant type is recorded.
    let grant_type = form
        .iter()
        .find(|(k, _)| *k == "grant_type")
        .map_or("", |(_, v)| *v);

    let record = serde_json::json!({
        "request": {
            "url": config.token_url,
            "method": "POST",
            "grant_type": grant_type,
        },
        "response": {
            "status": status.as_u16(),
            "body": body,
        },
    });
    tracing::info!(target: neris_logging::DEBUG_TARGET, record = %record, "token endpoint exchange");
}

fn basic_credentials(client_id: &str, client_secret: &str) -> String {
    STANDARD.encode(format!("{client_id}:{client_secret}"))
}

#[async_trait]
impl IdentityProvider for TokenEndpointProvider {
    async fn provider_config(&self) -> Result<ProviderConfig, AuthError> {
        Ok(ProviderConfig {
            token_url: format!("{}{TOKEN_PATH}", self.base_url),
            client_id: self.client_id.clone(),
        })
    }

    async fn acquire(
        &self,
        config: &ProviderConfig,
        grant: &Grant,
    ) -> Result<ProviderResponse, AuthError> {
        match grant {
            Grant::ClientCredentials {
                client_id,
                client_secret,
            } => {
                let form = [("grant_type", "client_credentials")];
                self.exchange(config, &form, Some(basic_credentials(client_id, client_secret)))
                    .await
            }
            Grant::Password { username, password } => {
                let form = [
                    ("grant_type", "password"),
                    ("username", username.as_str()),
                    ("password", password.as_str()),
                ];
                self.exchange(config, &form, None).await
            }
            Grant::RefreshToken { refresh_token } => {
                let form = [
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                ];
                self.exchange(config, &form, None).await
            }
        }
    }

    async fn refresh(
        &self,
        config: &ProviderConfig,
        grant: &Grant,
        refresh_token: &str,
    ) -> Result<ProviderResponse, AuthError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let basic = match grant {
            Grant::ClientCredentials {
                client_id,
                client_secret,
            } => Some(basic_credentials(client_id, client_secret)),
            _ => None,
        };
        self.exchange(config, &form, basic).await
    }

    async fn respond_to_challenge(
        &self,
        config: &ProviderConfig,
        grant: &Grant,
        challenge: &MfaChallenge,
        code: &str,
    ) -> Result<ProviderResponse, AuthError> {
        let Some(username) = grant.username() else {
            return Err(AuthError::UnsupportedChallenge(challenge.name.clone()));
        };
        let form = [
            ("grant_type", challenge.name.as_str()),
            ("username", username),
            ("session", challenge.session.as_str()),
            (challenge.name.as_str(), code),
        ];
        self.exchange(config, &form, None).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
