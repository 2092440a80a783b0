//! Settings resolution.
//!
//! Values are layered, later layers winning:
//! compiled defaults, then the user's `settings.json`, then `VERTO_*`
//! environment variables. The result is validated before it is returned.
//!
//! When layering the JSON file, objects merge key by key while arrays and
//! scalars are replaced whole. A `null` in the file leaves the default alone.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::VertoSettings;

/// Resolve the path to the settings file (`~/.verto/settings.json`).
pub fn settings_path() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(std::env::temp_dir, PathBuf::from)
        .join(".verto")
        .join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<VertoSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<VertoSettings> {
    let defaults = serde_json::to_value(VertoSettings::default())?;

    let layered = if path.is_file() {
        debug!(?path, "reading settings file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "no settings file, keeping defaults");
        defaults
    };

    let mut settings: VertoSettings = serde_json::from_value(layered)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Layer `overlay` on top of `base` and return the combined document.
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    merge_into(&mut base, overlay);
    base
}

fn merge_into(slot: &mut Value, overlay: Value) {
    match (slot, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None if value.is_null() => {}
                    None => {
                        let _ = base.insert(key, value);
                    }
                }
            }
        }
        (slot, overlay) => *slot = overlay,
    }
}

/// Apply `VERTO_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut VertoSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are ignored with a warning, falling back to file/default.
pub fn apply_overrides_from<F>(settings: &mut VertoSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = string("VERTO_MODEL_ROOT") {
        settings.registry.model_root = v;
    }
    if let Some(v) = string("VERTO_REGISTRY_FILE") {
        settings.registry.registry_file = v;
    }
    if let Some(v) = string("VERTO_PIVOT_LANGUAGE") {
        match verto_core::language::normalize_code(&v) {
            Ok(code) => settings.translation.pivot_language = code,
            Err(_) => warn_invalid("VERTO_PIVOT_LANGUAGE", &v),
        }
    }
    if let Some(v) = string("VERTO_CACHE_SIZE") {
        match parse_in_range(&v, 0..=10_000_000) {
            Some(n) => settings.translation.cache_size = n,
            None => warn_invalid("VERTO_CACHE_SIZE", &v),
        }
    }
    if let Some(v) = string("VERTO_FETCH_TIMEOUT_MS") {
        match parse_in_range(&v, 1000..=3_600_000) {
            Some(n) => settings.fetch.timeout_ms = n,
            None => warn_invalid("VERTO_FETCH_TIMEOUT_MS", &v),
        }
    }
    if let Some(v) = string("VERTO_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = string("VERTO_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => warn_invalid("VERTO_LOG_JSON", &v),
        }
    }
    if let Some(v) = string("VERTO_QUEUE_CAPACITY") {
        match parse_in_range(&v, 1..=1024) {
            Some(n) => settings.worker.queue_capacity = n,
            None => warn_invalid("VERTO_QUEUE_CAPACITY", &v),
        }
    }
}

/// Reject settings the worker cannot start with.
pub fn validate(settings: &VertoSettings) -> Result<()> {
    if verto_core::language::normalize_code(&settings.translation.pivot_language).is_err() {
        return Err(SettingsError::InvalidValue(format!(
            "pivotLanguage '{}' is not a 2-letter code",
            settings.translation.pivot_language
        )));
    }
    if settings.registry.model_root.trim().is_empty() {
        return Err(SettingsError::InvalidValue("modelRoot is empty".to_string()));
    }
    if settings.worker.queue_capacity == 0 {
        return Err(SettingsError::InvalidValue("queueCapacity must be at least 1".to_string()));
    }
    Ok(())
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "invalid env var, ignoring");
}

/// Interpret common truthy and falsy spellings, ignoring case.
pub fn parse_bool(val: &str) -> Option<bool> {
    let val = val.trim().to_ascii_lowercase();
    if ["true", "1", "yes", "on"].contains(&val.as_str()) {
        Some(true)
    } else if ["false", "0", "no", "off"].contains(&val.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Parse `val` and keep it only if it lies in `range`.
pub fn parse_in_range<T>(val: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    val.trim().parse().ok().filter(|n| range.contains(n))
}
