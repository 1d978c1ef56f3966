//! # neris-settings
//!
//! Configuration for the NERIS API client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`NerisSettings::default()`]
//! 2. **User file**: `~/.neris/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `NERIS_*` overrides (highest priority)
//!
//! Raw settings are then validated into a [`CredentialConfig`]. Validation
//! fails fast with [`SettingsError::Configuration`] when the selected grant
//! kind is missing a required secret.
//!
//! # Usage
//!
//! ```no_run
//! use neris_settings::{CredentialConfig, load_settings};
//!
//! let settings = load_settings().unwrap();
//! let config = CredentialConfig::from_settings(&settings).unwrap();
//! println!("target: {}", config.base_url);
//! ```

#![deny(unsafe_code)]

pub mod credentials;
pub mod errors;
pub mod loader;
pub mod types;

pub use credentials::{CredentialConfig, Grant, GrantKind};
pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, neris_dir, settings_path};
pub use types::{DEFAULT_BASE_URL, Environment, NerisSettings, TokenCacheSettings};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
