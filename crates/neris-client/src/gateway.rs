//! Authenticated request gateway.
//!
//! Every [`ApiClient::call`] first asks the negotiator for a usable token,
//! attaches it as a bearer credential, dispatches the request on the shared
//! `reqwest::Client` and classifies the response. Nothing is retried here.

use std::sync::Arc;

use neris_auth::redact::{mask_authorization, redact_json};
use neris_auth::{
    AuthError, AuthState, AuthStatus, IdentityProvider, Negotiator, TokenCache,
    TokenEndpointProvider, TokenSet,
};
use neris_settings::{CredentialConfig, NerisSettings, SettingsError};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::ClientError;
use crate::response::{CallOutcome, Payload, RequestBody, RequestFailure};

struct Inner {
    config: CredentialConfig,
    http: reqwest::Client,
    /// `None` when the environment skips auth.
    negotiator: Option<Negotiator>,
}

/// NERIS API client.
///
/// Cheap to clone; clones share one negotiator and one token set.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    /// Client using the API's own token endpoint.
    pub fn new(config: CredentialConfig) -> Result<Self, ClientError> {
        let http = build_http(&config)?;
        let provider = Arc::new(TokenEndpointProvider::new(http.clone(), &config));
        Self::build(config, http, provider)
    }

    /// Client using a custom identity-provider adapter.
    pub fn with_provider(
        config: CredentialConfig,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, ClientError> {
        let http = build_http(&config)?;
        Self::build(config, http, provider)
    }

    /// Validate raw settings and build a client.
    pub fn from_settings(settings: &NerisSettings) -> Result<Self, ClientError> {
        Self::new(CredentialConfig::from_settings(settings)?)
    }

    /// Build a client from `~/.neris/settings.json` and `NERIS_*` variables.
    pub fn from_env() -> Result<Self, ClientError> {
        let settings = neris_settings::load_settings()?;
        Self::from_settings(&settings)
    }

    fn build(
        config: CredentialConfig,
        http: reqwest::Client,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, ClientError> {
        let negotiator = if config.environment.skips_auth() {
            None
        } else {
            let grant = config.grant.clone().ok_or_else(|| {
                SettingsError::Configuration(format!(
                    "a grant is required in the `{}` environment",
                    config.environment
                ))
            })?;
            let mut negotiator = Negotiator::new(grant, provider);
            if let Some(dir) = &config.token_cache_dir {
                negotiator = negotiator.with_token_cache(TokenCache::new(dir));
            }
            Some(negotiator)
        };

        tracing::debug!(
            base_url = %config.base_url,
            environment = %config.environment,
            grant = config.grant.as_ref().map(|g| g.kind().as_str()),
            "API client initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http,
                negotiator,
            }),
        })
    }

    /// The client's configuration.
    pub fn config(&self) -> &CredentialConfig {
        &self.inner.config
    }

    /// The negotiator, unless auth is skipped.
    pub fn negotiator(&self) -> Option<&Negotiator> {
        self.inner.negotiator.as_ref()
    }

    /// Current auth state, or `None` when auth is skipped.
    pub fn auth_state(&self) -> Option<AuthState> {
        self.inner.negotiator.as_ref().map(Negotiator::state)
    }

    /// Start interactive authentication ahead of the first call.
    pub async fn begin_auth(&self) -> Result<AuthStatus, ClientError> {
        match &self.inner.negotiator {
            Some(negotiator) => Ok(negotiator.begin_auth().await?),
            None => Ok(AuthStatus::Authenticated { warning: None }),
        }
    }

    /// Answer the pending MFA challenge.
    pub async fn submit_challenge_response(&self, code: &str) -> Result<AuthStatus, ClientError> {
        match &self.inner.negotiator {
            Some(negotiator) => Ok(negotiator.submit_challenge_response(code).await?),
            None => Err(AuthError::NoPendingChallenge.into()),
        }
    }

    /// Drop the pending MFA challenge.
    pub fn abandon_challenge(&self) {
        if let Some(negotiator) = &self.inner.negotiator {
            negotiator.abandon_challenge();
        }
    }

    /// Seed the client with a token set obtained elsewhere.
    pub fn restore_session(&self, tokens: TokenSet) {
        if let Some(negotiator) = &self.inner.negotiator {
            negotiator.restore_session(tokens);
        }
    }

    /// Perform an authenticated call on `{base_url}{path}`.
    ///
    /// Non-2xx responses resolve to [`CallOutcome::Failure`]; only auth,
    /// configuration and transport problems are errors.
    #[tracing::instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        params: Option<&[(&str, &str)]>,
    ) -> Result<CallOutcome, ClientError> {
        let authorized = match &self.inner.negotiator {
            Some(negotiator) => Some(negotiator.ensure_authenticated().await?),
            None => None,
        };

        let url = self.inner.config.url(path);
        let mut builder = self.inner.http.request(method, &url);
        if let Some(authorized) = &authorized {
            builder = builder.bearer_auth(&authorized.access_token);
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }
        if let Some(params) = params {
            builder = builder.query(params);
        }
        let request = builder.build()?;

        let request_record = self
            .inner
            .config
            .debug
            .then(|| request_record(&request, body.as_ref(), params));

        let resp = self.inner.http.execute(request).await?;
        let status = resp.status();
        let response_headers = request_record.as_ref().map(|_| headers_json(resp.headers()));
        let payload = Payload::from_text(resp.text().await?);

        if let (Some(request), Some(headers)) = (request_record, response_headers) {
            let mut body = payload.clone().into_json();
            redact_json(&mut body);
            let record = serde_json::json!({
                "request": request,
                "response": {
                    "status": status.as_u16(),
                    "headers": headers,
                    "body": body,
                },
            });
            tracing::info!(target: neris_logging::DEBUG_TARGET, record = %record, "api call");
        }

        if status.is_success() {
            Ok(CallOutcome::Success(payload))
        } else {
            tracing::debug!(status = status.as_u16(), "api call failed");
            Ok(CallOutcome::Failure(RequestFailure {
                status: status.as_u16(),
                payload,
            }))
        }
    }

    /// Like [`call`](Self::call), but first round-trips `body` through the
    /// model `M`. An invalid body fails before any request is sent.
    pub async fn call_validated<M>(
        &self,
        method: Method,
        path: &str,
        body: impl Into<RequestBody>,
        params: Option<&[(&str, &str)]>,
    ) -> Result<CallOutcome, ClientError>
    where
        M: Serialize + DeserializeOwned,
    {
        let body = normalize_body::<M>(body.into())?;
        self.call(method, path, Some(body), params).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.inner.config)
            .field("negotiator", &self.inner.negotiator)
            .finish_non_exhaustive()
    }
}

fn build_http(config: &CredentialConfig) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Parse and round-trip a body through the model `M`.
pub fn normalize_body<M>(body: RequestBody) -> Result<Value, ClientError>
where
    M: Serialize + DeserializeOwned,
{
    let value = body.into_value()?;
    let model: M =
        serde_json::from_value(value).map_err(|e| ClientError::InvalidBody(e.to_string()))?;
    serde_json::to_value(model).map_err(|e| ClientError::InvalidBody(e.to_string()))
}

fn headers_json(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for (name, value) in headers {
        let value = value.to_str().unwrap_or("<binary>");
        let value = if *name == AUTHORIZATION {
            mask_authorization(value)
        } else {
            value.to_string()
        };
        let _ = map.insert(name.as_str().to_string(), Value::String(value));
    }
    Value::Object(map)
}

fn request_record(
    request: &reqwest::Request,
    body: Option<&Value>,
    params: Option<&[(&str, &str)]>,
) -> Value {
    let mut body = body.cloned().unwrap_or(Value::Null);
    redact_json(&mut body);
    let params: Map<String, Value> = params
        .unwrap_or_default()
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
        .collect();

    serde_json::json!({
        "url": request.url().as_str(),
        "method": request.method().as_str(),
        "headers": headers_json(request.headers()),
        "params": params,
        "body": body,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
