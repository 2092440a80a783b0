//! In-memory fixtures shared by unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::json;
use verto_core::{Result, VertoError};
use verto_settings::RegistrySettings;

use crate::fetcher::AssetFetcher;
use crate::registry::RegistryClient;

pub(crate) const MODEL_ROOT: &str = "mem://models";

/// Serves fixed bytes per URL and records every request.
pub(crate) struct MemoryFetcher {
    files: Mutex<HashMap<String, Bytes>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub(crate) fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Registry plus artifacts for `ende`, `enes`, `esen`, `fren` and `deen`.
    pub(crate) fn with_sample_models() -> Self {
        let fetcher = Self::new();
        let registry = json!({
            "ende": {
                "model": {"name": "model.ende.bin"},
                "vocab": {"name": "vocab.deen.spm"}
            },
            "deen": {
                "model": {"name": "model.deen.bin"},
                "vocab": {"name": "vocab.deen.spm"}
            },
            "enes": {
                "model": {"name": "model.enes.bin"},
                "lex": {"name": "lex.enes.bin"},
                "vocab": {"name": "vocab.esen.spm"},
                "qualityModel": {"name": "qe.enes.bin"}
            },
            "esen": {
                "model": {"name": "model.esen.bin"},
                "lex": {"name": "lex.esen.bin"},
                "vocab": {"name": "vocab.esen.spm"}
            },
            "fren": {
                "model": {"name": "model.fren.bin"},
                "lex": {"name": "lex.fren.bin"},
                "vocab": {"name": "vocab.fren.spm"}
            }
        });
        fetcher.insert("registry.json", registry.to_string().into_bytes());

        for (pair, entry) in registry.as_object().into_iter().flatten() {
            for artifact in entry.as_object().into_iter().flatten().map(|(_, a)| a) {
                if let Some(name) = artifact["name"].as_str() {
                    let body = format!("{pair}:{name}").into_bytes();
                    fetcher.insert(&format!("{pair}/{name}"), body);
                }
            }
        }
        fetcher
    }

    pub(crate) fn insert(&self, path: &str, body: Vec<u8>) {
        let _ = self
            .files
            .lock()
            .insert(format!("{MODEL_ROOT}/{path}"), Bytes::from(body));
    }

    pub(crate) fn remove_matching(&self, needle: &str) {
        self.files.lock().retain(|url, _| !url.contains(needle));
    }

    pub(crate) fn count_matching(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|url| url.contains(needle))
            .count()
    }
}

#[async_trait]
impl AssetFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        self.requests.lock().push(url.to_string());
        self.files
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| VertoError::Download {
                url: url.to_string(),
                status: 404,
                status_text: "Not Found".into(),
            })
    }
}

pub(crate) fn registry_settings() -> RegistrySettings {
    RegistrySettings {
        model_root: MODEL_ROOT.into(),
        ..RegistrySettings::default()
    }
}

/// A registry client that has already fetched the sample registry.
pub(crate) async fn ready_registry(fetcher: &Arc<MemoryFetcher>) -> RegistryClient {
    let mut client = RegistryClient::new(registry_settings(), fetcher.clone());
    let _ = client.init().await.unwrap();
    client
}
