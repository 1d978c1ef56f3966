//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading settings or building a credential
/// configuration from them.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The selected grant kind is unknown or is missing a required field.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SettingsError {
    pub(crate) fn missing(field: &str, grant: &str) -> Self {
        Self::Configuration(format!("`{field}` is required for the `{grant}` grant"))
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
