//! Validated credential configuration.
//!
//! [`CredentialConfig`] is the immutable, per-client view of the settings.
//! Building one checks that the selected grant carries every field it needs,
//! so a misconfigured client fails at construction instead of on its first
//! request.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{Result, SettingsError};
use crate::loader::neris_dir;
use crate::types::{Environment, NerisSettings};

/// Grant kind names accepted by the identity provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantKind {
    /// Confidential client id/secret.
    ClientCredentials,
    /// Interactive username/password.
    Password,
    /// Previously issued refresh token.
    RefreshToken,
}

impl GrantKind {
    /// Wire name used as the `grant_type` form value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl FromStr for GrantKind {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "client_credentials" => Ok(Self::ClientCredentials),
            "password" => Ok(Self::Password),
            "refresh_token" => Ok(Self::RefreshToken),
            other => Err(SettingsError::Configuration(format!(
                "unsupported grant type `{other}`; expected `client_credentials`, `password` or `refresh_token`"
            ))),
        }
    }
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The active grant and its secrets.
#[derive(Clone, PartialEq, Eq)]
pub enum Grant {
    /// Confidential client credentials, sent as HTTP Basic auth.
    ClientCredentials {
        /// Client id.
        client_id: String,
        /// Client secret.
        client_secret: String,
    },
    /// Interactive username/password. May trigger an MFA challenge.
    Password {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// A refresh token obtained elsewhere.
    RefreshToken {
        /// The refresh token.
        refresh_token: String,
    },
}

impl Grant {
    /// Build a client-credentials grant.
    pub fn client_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let kind = GrantKind::ClientCredentials;
        let client_id = required(Some(client_id.into()), "client_id", kind)?;
        let client_secret = required(Some(client_secret.into()), "client_secret", kind)?;
        Ok(Self::ClientCredentials {
            client_id,
            client_secret,
        })
    }

    /// Build a password grant.
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let username = required(Some(username.into()), "username", GrantKind::Password)?;
        let password = required(Some(password.into()), "password", GrantKind::Password)?;
        Ok(Self::Password { username, password })
    }

    /// Build a refresh-token grant.
    pub fn refresh_token(refresh_token: impl Into<String>) -> Result<Self> {
        let refresh_token =
            required(Some(refresh_token.into()), "refresh_token", GrantKind::RefreshToken)?;
        Ok(Self::RefreshToken { refresh_token })
    }

    /// Build the grant selected by `kind` from raw settings.
    pub fn from_settings(kind: GrantKind, settings: &NerisSettings) -> Result<Self> {
        match kind {
            GrantKind::ClientCredentials => Ok(Self::ClientCredentials {
                client_id: required(settings.client_id.clone(), "client_id", kind)?,
                client_secret: required(settings.client_secret.clone(), "client_secret", kind)?,
            }),
            GrantKind::Password => Ok(Self::Password {
                username: required(settings.username.clone(), "username", kind)?,
                password: required(settings.password.clone(), "password", kind)?,
            }),
            GrantKind::RefreshToken => Ok(Self::RefreshToken {
                refresh_token: required(settings.refresh_token.clone(), "refresh_token", kind)?,
            }),
        }
    }

    /// The grant kind.
    pub fn kind(&self) -> GrantKind {
        match self {
            Self::ClientCredentials { .. } => GrantKind::ClientCredentials,
            Self::Password { .. } => GrantKind::Password,
            Self::RefreshToken { .. } => GrantKind::RefreshToken,
        }
    }

    /// Username of the interactive grant.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Password { username, .. } => Some(username),
            _ => None,
        }
    }
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .finish(),
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::RefreshToken { .. } => f
                .debug_struct("RefreshToken")
                .field("refresh_token", &"***")
                .finish(),
        }
    }
}

fn required(value: Option<String>, field: &str, kind: GrantKind) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SettingsError::missing(field, kind.as_str()))
}

/// Immutable per-client configuration.
#[derive(Clone, Debug)]
pub struct CredentialConfig {
    /// API base URL without a trailing slash.
    pub base_url: String,
    /// Log structured request/response records.
    pub debug: bool,
    /// Target environment.
    pub environment: Environment,
    /// Active grant. Only `None` for [`Environment::Local`].
    pub grant: Option<Grant>,
    /// Token cache directory. Only set for the password grant.
    pub token_cache_dir: Option<PathBuf>,
    /// Transport timeout.
    pub timeout: Option<Duration>,
}

impl CredentialConfig {
    /// Configuration for an authenticated environment.
    pub fn new(base_url: impl Into<String>, grant: Grant) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            debug: false,
            environment: Environment::Production,
            grant: Some(grant),
            token_cache_dir: None,
            timeout: Some(Duration::from_secs(crate::types::DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Configuration for a local development server without auth.
    pub fn local(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            debug: false,
            environment: Environment::Local,
            grant: None,
            token_cache_dir: None,
            timeout: Some(Duration::from_secs(crate::types::DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Enable debug records.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the target environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the transport timeout (`None` disables it).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable the token cache in `dir`.
    ///
    /// Fails unless the active grant is the interactive password grant.
    pub fn with_token_cache(mut self, dir: impl Into<PathBuf>) -> Result<Self> {
        if !matches!(self.grant, Some(Grant::Password { .. })) {
            return Err(SettingsError::Configuration(
                "the token cache is only available for the `password` grant".to_string(),
            ));
        }
        self.token_cache_dir = Some(dir.into());
        Ok(self)
    }

    /// Validate raw settings into a credential configuration.
    pub fn from_settings(settings: &NerisSettings) -> Result<Self> {
        let grant = match settings.grant_type.as_deref().filter(|g| !g.is_empty()) {
            Some(name) => Some(Grant::from_settings(name.parse()?, settings)?),
            None if settings.environment.skips_auth() => None,
            None => {
                return Err(SettingsError::Configuration(
                    "no grant type configured; set NERIS_GRANT_TYPE to `client_credentials`, `password` or `refresh_token`"
                        .to_string(),
                ));
            }
        };

        // The cache only serves the interactive flow; other grants ignore it.
        let token_cache_dir = match &grant {
            Some(Grant::Password { .. }) if settings.token_cache.enabled => Some(
                settings
                    .token_cache
                    .dir
                    .as_ref()
                    .map_or_else(neris_dir, PathBuf::from),
            ),
            _ => None,
        };

        Ok(Self {
            base_url: normalize_base_url(settings.base_url.clone()),
            debug: settings.debug,
            environment: settings.environment,
            grant,
            token_cache_dir,
            timeout: (settings.timeout_secs > 0).then(|| Duration::from_secs(settings.timeout_secs)),
        })
    }

    /// URL of a resource path under the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        let _ = url.pop();
    }
    url
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn settings(grant_type: &str) -> NerisSettings {
        NerisSettings {
            grant_type: Some(grant_type.to_string()),
            ..NerisSettings::default()
        }
    }

    #[test]
    fn client_credentials_requires_secret() {
        let s = NerisSettings {
            client_id: Some("id1".into()),
            ..settings("client_credentials")
        };
        let err = CredentialConfig::from_settings(&s).unwrap_err();
        assert_matches!(err, SettingsError::Configuration(msg) if msg.contains("client_secret"));
    }

    #[test]
    fn password_requires_username() {
        let s = NerisSettings {
            password: Some("pw".into()),
            ..settings("password")
        };
        let err = CredentialConfig::from_settings(&s).unwrap_err();
        assert_matches!(err, SettingsError::Configuration(msg) if msg.contains("username"));
    }

    #[test]
    fn refresh_token_grant_requires_token() {
        let err = CredentialConfig::from_settings(&settings("refresh_token")).unwrap_err();
        assert_matches!(err, SettingsError::Configuration(msg) if msg.contains("refresh_token"));
    }

    #[test]
    fn empty_string_counts_as_missing() {
        assert_matches!(
            Grant::password("", "pw"),
            Err(SettingsError::Configuration(_))
        );
        assert_matches!(
            Grant::client_credentials("id1", ""),
            Err(SettingsError::Configuration(_))
        );
        assert_matches!(Grant::refresh_token(""), Err(SettingsError::Configuration(_)));
    }

    #[test]
    fn unknown_grant_type_rejected() {
        let err = CredentialConfig::from_settings(&settings("implicit")).unwrap_err();
        assert_matches!(err, SettingsError::Configuration(msg) if msg.contains("implicit"));
    }

    #[test]
    fn missing_grant_rejected_outside_local() {
        let err = CredentialConfig::from_settings(&NerisSettings::default()).unwrap_err();
        assert_matches!(err, SettingsError::Configuration(_));
    }

    #[test]
    fn local_environment_allows_no_grant() {
        let s = NerisSettings {
            environment: Environment::Local,
            base_url: "http://localhost:8000/".into(),
            ..NerisSettings::default()
        };
        let cfg = CredentialConfig::from_settings(&s).unwrap();
        assert!(cfg.grant.is_none());
        assert_eq!(cfg.base_url, "http://localhost:8000");
    }

    #[test]
    fn valid_client_credentials() {
        let s = NerisSettings {
            client_id: Some("id1".into()),
            client_secret: Some("secret1".into()),
            base_url: "https://example/v1".into(),
            ..settings("client_credentials")
        };
        let cfg = CredentialConfig::from_settings(&s).unwrap();
        assert_eq!(cfg.grant.as_ref().unwrap().kind(), GrantKind::ClientCredentials);
        assert_eq!(cfg.url("/health"), "https://example/v1/health");
        assert_eq!(cfg.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn token_cache_only_for_password() {
        let s = NerisSettings {
            client_id: Some("id1".into()),
            client_secret: Some("secret1".into()),
            token_cache: crate::types::TokenCacheSettings {
                enabled: true,
                dir: Some("/tmp/neris".into()),
            },
            ..settings("client_credentials")
        };
        let cfg = CredentialConfig::from_settings(&s).unwrap();
        assert!(cfg.token_cache_dir.is_none());

        let s = NerisSettings {
            username: Some("u".into()),
            password: Some("p".into()),
            grant_type: Some("password".into()),
            ..s
        };
        let cfg = CredentialConfig::from_settings(&s).unwrap();
        assert_eq!(cfg.token_cache_dir, Some(PathBuf::from("/tmp/neris")));
    }

    #[test]
    fn with_token_cache_rejects_non_interactive() {
        let grant = Grant::client_credentials("id1", "secret1").unwrap();
        let result = CredentialConfig::new("https://example/v1", grant).with_token_cache("/tmp");
        assert_matches!(result, Err(SettingsError::Configuration(_)));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let s = NerisSettings {
            refresh_token: Some("rt".into()),
            timeout_secs: 0,
            ..settings("refresh_token")
        };
        assert!(CredentialConfig::from_settings(&s).unwrap().timeout.is_none());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let grant = Grant::password("alice", "hunter2").unwrap();
        let printed = format!("{grant:?}");
        assert!(printed.contains("alice"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn grant_kind_round_trip() {
        for kind in [
            GrantKind::ClientCredentials,
            GrantKind::Password,
            GrantKind::RefreshToken,
        ] {
            assert_eq!(kind.as_str().parse::<GrantKind>().unwrap(), kind);
        }
    }
}
