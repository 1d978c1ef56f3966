//! Raw settings schema.
//!
//! Mirrors `~/.neris/settings.json`. Every field is optional in the file;
//! missing values fall back to [`NerisSettings::default()`].

use serde::{Deserialize, Serialize};

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.neris.fsri.org/v1";

/// Default transport timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Target environment of the resource API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Hosted production API.
    #[default]
    Production,
    /// Hosted test API.
    Test,
    /// Local development server without authentication.
    Local,
}

impl Environment {
    /// Parse an environment name (case-insensitive).
    pub fn parse(val: &str) -> Option<Self> {
        match val.to_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "test" => Some(Self::Test),
            "local" | "dev" => Some(Self::Local),
            _ => None,
        }
    }

    /// Whether resource calls skip authentication entirely.
    pub fn skips_auth(self) -> bool {
        matches!(self, Self::Local)
    }

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Test => "test",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token cache settings for the interactive (password) flow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenCacheSettings {
    /// Persist the token set between runs.
    pub enabled: bool,
    /// Cache directory. Defaults to `~/.neris`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

/// Top-level settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NerisSettings {
    /// API base URL. The identity provider lives at `{base_url}/token`.
    pub base_url: String,
    /// Log structured request/response records.
    pub debug: bool,
    /// Target environment.
    pub environment: Environment,
    /// Grant kind name: `client_credentials`, `password` or `refresh_token`.
    pub grant_type: Option<String>,
    /// Confidential client id.
    pub client_id: Option<String>,
    /// Confidential client secret.
    pub client_secret: Option<String>,
    /// Interactive username.
    pub username: Option<String>,
    /// Interactive password.
    pub password: Option<String>,
    /// Long-lived refresh token for the `refresh_token` grant.
    pub refresh_token: Option<String>,
    /// Token cache settings.
    pub token_cache: TokenCacheSettings,
    /// Transport timeout in seconds (`0` disables it).
    pub timeout_secs: u64,
}

impl Default for NerisSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            debug: false,
            environment: Environment::default(),
            grant_type: None,
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            refresh_token: None,
            token_cache: TokenCacheSettings::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for NerisSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let masked = |secret: Option<&String>| secret.map(|_| "***");
        f.debug_struct("NerisSettings")
            .field("base_url", &self.base_url)
            .field("debug", &self.debug)
            .field("environment", &self.environment)
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &masked(self.client_secret.as_ref()))
            .field("username", &self.username)
            .field("password", &masked(self.password.as_ref()))
            .field("refresh_token", &masked(self.refresh_token.as_ref()))
            .field("token_cache", &self.token_cache)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
