//! Token cache file I/O.
//!
//! Reads and writes `{dir}/tokens.json` with secure file permissions (0o600).

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::AuthError;
use crate::types::{ProviderConfig, TokenSet};

/// Cache file name.
const CACHE_FILE_NAME: &str = "tokens.json";

/// Supported on-disk format version.
const CACHE_VERSION: u32 = 1;

/// On-disk cache entry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    version: u32,
    provider: ProviderConfig,
    subject: String,
    #[serde(flatten)]
    tokens: TokenSet,
    last_updated: String,
}

/// File-backed cache of one interactive session's [`TokenSet`].
#[derive(Clone, Debug)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// Cache stored under `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CACHE_FILE_NAME),
        }
    }

    /// Path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached token set, whoever it belongs to.
    ///
    /// Returns `None` if the file doesn't exist or is invalid.
    pub fn load(&self) -> Option<TokenSet> {
        self.read_entry().map(|entry| entry.tokens)
    }

    /// Load the cached token set only if it was written for this provider
    /// and subject.
    pub fn load_for(&self, provider: &ProviderConfig, subject: &str) -> Option<TokenSet> {
        let entry = self.read_entry()?;
        if entry.provider != *provider || entry.subject != subject {
            tracing::debug!(
                path = %self.path.display(),
                "token cache belongs to another account, ignoring"
            );
            return None;
        }
        Some(entry.tokens)
    }

    /// Write the token set, replacing any previous entry.
    ///
    /// Creates parent directories if needed.
    pub fn save(
        &self,
        provider: &ProviderConfig,
        subject: &str,
        tokens: &TokenSet,
    ) -> Result<(), AuthError> {
        let entry = CacheEntry {
            version: CACHE_VERSION,
            provider: provider.clone(),
            subject: subject.to_string(),
            tokens: tokens.clone(),
            last_updated: chrono::Utc::now().to_rfc3339(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&entry)?;

        let mut options = std::fs::OpenOptions::new();
        let _ = options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let _ = options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // `mode` only applies on creation; tighten a file left by an older write.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = file.set_permissions(std::fs::Permissions::from_mode(0o600)) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to restrict token cache permissions");
            }
        }

        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Delete the cache file. A missing file is not an error.
    pub fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_entry(&self) -> Option<CacheEntry> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("failed to read token cache: {e}");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&data) {
            Ok(entry) if entry.version == CACHE_VERSION => Some(entry),
            Ok(entry) => {
                tracing::warn!("unsupported token cache version: {}", entry.version);
                None
            }
            Err(e) => {
                tracing::warn!("failed to parse token cache: {e}");
                None
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
