//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a partial
//! JSON document fills every missing field from [`Default`].

use serde::{Deserialize, Serialize};
use verto_core::language::DEFAULT_PIVOT_LANGUAGE;

/// Root settings for the translation worker.
///
/// ```json
/// {
///   "registry": { "modelRoot": "https://cdn.example.org/models" },
///   "translation": { "pivotLanguage": "en" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VertoSettings {
    /// Where models and the registry live.
    pub registry: RegistrySettings,
    /// Routing and engine service settings.
    pub translation: TranslationSettings,
    /// Artifact download settings.
    pub fetch: FetchSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Command loop settings.
    pub worker: WorkerSettings,
}

/// Model registry location.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrySettings {
    /// Base URL holding `registry.json` and one directory per pair.
    pub model_root: String,
    /// Registry file name under `model_root`.
    pub registry_file: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            model_root: "http://localhost:8000/models".to_string(),
            registry_file: "registry.json".to_string(),
        }
    }
}

impl RegistrySettings {
    /// Full URL of the registry document.
    pub fn registry_url(&self) -> String {
        join_url(&self.model_root, &[&self.registry_file])
    }
}

/// Routing and engine service settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationSettings {
    /// Intermediate language for pairs without a direct model.
    pub pivot_language: String,
    /// Entries in the engine's translation cache.
    pub cache_size: usize,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            pivot_language: DEFAULT_PIVOT_LANGUAGE.to_string(),
            cache_size: 20_000,
        }
    }
}

/// Artifact download settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchSettings {
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            user_agent: format!("verto/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Command loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerSettings {
    /// Commands buffered before senders wait.
    pub queue_capacity: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self { queue_capacity: 16 }
    }
}

/// Join a base URL and path segments with exactly one `/` between each.
pub fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(segment.trim_matches('/'));
    }
    url
}
