//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`NerisSettings::default()`]
//! 2. If `~/.neris/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `NERIS_*` environment variable overrides (highest priority)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{Environment, NerisSettings};

/// Resolve the client's home directory (`~/.neris`).
pub fn neris_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".neris")
}

/// Resolve the path to the settings file (`~/.neris/settings.json`).
pub fn settings_path() -> PathBuf {
    neris_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<NerisSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<NerisSettings> {
    let defaults = serde_json::to_value(NerisSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: NerisSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning and fall back to file/default.
pub fn apply_env_overrides(settings: &mut NerisSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
///
/// Split from [`apply_env_overrides`] so tests don't touch the process
/// environment.
pub fn apply_overrides(settings: &mut NerisSettings, var: impl Fn(&str) -> Option<String>) {
    let string = |name: &str| var(name).filter(|v| !v.is_empty());

    // ── Target ──────────────────────────────────────────────────────
    if let Some(v) = string("NERIS_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = string("NERIS_DEBUG") {
        match parse_bool(&v) {
            Some(b) => settings.debug = b,
            None => warn_invalid("NERIS_DEBUG", &v),
        }
    }
    if let Some(v) = string("NERIS_ENVIRONMENT") {
        match Environment::parse(&v) {
            Some(env) => settings.environment = env,
            None => warn_invalid("NERIS_ENVIRONMENT", &v),
        }
    }
    if let Some(v) = string("NERIS_TIMEOUT_SECS") {
        match parse_u64_range(&v, 0, 3600) {
            Some(n) => settings.timeout_secs = n,
            None => warn_invalid("NERIS_TIMEOUT_SECS", &v),
        }
    }

    // ── Credentials ─────────────────────────────────────────────────
    if let Some(v) = string("NERIS_GRANT_TYPE") {
        settings.grant_type = Some(v);
    }
    if let Some(v) = string("NERIS_CLIENT_ID") {
        settings.client_id = Some(v);
    }
    if let Some(v) = string("NERIS_CLIENT_SECRET") {
        settings.client_secret = Some(v);
    }
    if let Some(v) = string("NERIS_USERNAME") {
        settings.username = Some(v);
    }
    if let Some(v) = string("NERIS_PASSWORD") {
        settings.password = Some(v);
    }
    if let Some(v) = string("NERIS_REFRESH_TOKEN") {
        settings.refresh_token = Some(v);
    }

    // ── Token cache ─────────────────────────────────────────────────
    if let Some(v) = string("NERIS_TOKEN_CACHE") {
        match parse_bool(&v) {
            Some(b) => settings.token_cache.enabled = b,
            None => warn_invalid("NERIS_TOKEN_CACHE", &v),
        }
    }
    if let Some(v) = string("NERIS_CACHE_DIR") {
        settings.token_cache.dir = Some(v);
    }
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "invalid env var, ignoring");
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
