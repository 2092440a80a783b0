//! Model registry client.
//!
//! The registry is a JSON document mapping pair keys to artifact entries:
//!
//! ```json
//! { "ende": { "model": { "name": "model.ende.intgemm.bin", "size": 17140899 },
//!             "vocab": { "name": "vocab.deen.spm" } } }
//! ```
//!
//! It is fetched once, kept verbatim for the host, and read-only afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};
use verto_core::{ArtifactKind, LanguagePair, Result, VertoError};
use verto_settings::{RegistrySettings, join_url};

use crate::fetcher::AssetFetcher;

/// One artifact entry. Metadata other than `name` is kept as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// File name under the pair's directory.
    pub name: String,
    /// Remaining metadata (`size`, hashes, ...).
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// An artifact a pair provides, with its required alignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactSpec {
    /// Artifact type.
    pub kind: ArtifactKind,
    /// File name under the pair's directory.
    pub file_name: String,
    /// Byte alignment the engine requires for this type.
    pub alignment: usize,
}

/// Parsed registry document.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    raw: Value,
    entries: BTreeMap<LanguagePair, BTreeMap<ArtifactKind, ArtifactEntry>>,
}

impl ModelRegistry {
    /// Validate and index a registry document.
    ///
    /// Keys that are not lowercase 4-letter pair keys and unknown artifact
    /// types are skipped; a known artifact type without a string `name` is
    /// an error. Model URLs are built from the pair key, so a key in any
    /// other case could never be fetched.
    pub fn from_json(raw: Value) -> Result<Self> {
        let Some(pairs) = raw.as_object() else {
            return Err(VertoError::Registry("expected a JSON object".into()));
        };

        let mut entries = BTreeMap::new();
        for (key, artifacts) in pairs {
            let Some(pair) = LanguagePair::try_from(key.clone())
                .ok()
                .filter(|pair| pair.key() == *key)
            else {
                warn!(key = %key, "skipping registry entry with invalid pair key");
                continue;
            };
            let Some(artifacts) = artifacts.as_object() else {
                return Err(VertoError::Registry(format!("entry '{key}' is not an object")));
            };

            let mut kinds = BTreeMap::new();
            for (type_name, entry) in artifacts {
                let Some(kind) = ArtifactKind::from_registry_name(type_name) else {
                    continue;
                };
                let entry: ArtifactEntry = serde_json::from_value(entry.clone()).map_err(|e| {
                    VertoError::Registry(format!("'{key}.{type_name}': {e}"))
                })?;
                let _ = kinds.insert(kind, entry);
            }
            let _ = entries.insert(pair, kinds);
        }

        Ok(Self { raw, entries })
    }

    /// Parse a registry from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: Value =
            serde_json::from_slice(bytes).map_err(|e| VertoError::Registry(e.to_string()))?;
        Self::from_json(raw)
    }

    /// The document exactly as fetched.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Known pairs, sorted by key.
    pub fn pairs(&self) -> Vec<LanguagePair> {
        self.entries.keys().cloned().collect()
    }

    /// Artifacts available for `pair`, in [`ArtifactKind::ALL`] order.
    pub fn artifacts_for(&self, pair: &LanguagePair) -> Result<Vec<ArtifactSpec>> {
        let kinds = self
            .entries
            .get(pair)
            .ok_or_else(|| VertoError::UnknownPair(pair.clone()))?;

        let mut specs = Vec::with_capacity(kinds.len());
        for kind in ArtifactKind::ALL {
            match kinds.get(&kind) {
                Some(entry) => specs.push(ArtifactSpec {
                    kind,
                    file_name: entry.name.clone(),
                    alignment: kind.alignment(),
                }),
                None if kind.is_required() => {
                    return Err(VertoError::MissingArtifact {
                        pair: pair.clone(),
                        kind,
                    });
                }
                None => {}
            }
        }
        Ok(specs)
    }
}

/// Fetches the registry once and answers artifact lookups.
pub struct RegistryClient {
    settings: RegistrySettings,
    fetcher: Arc<dyn AssetFetcher>,
    registry: Option<ModelRegistry>,
}

impl RegistryClient {
    /// Create an uninitialized client.
    pub fn new(settings: RegistrySettings, fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            settings,
            fetcher,
            registry: None,
        }
    }

    /// Fetch the registry if not yet loaded and return it.
    pub async fn init(&mut self) -> Result<&ModelRegistry> {
        if self.registry.is_none() {
            let url = self.settings.registry_url();
            let bytes = self.fetcher.fetch(&url).await?;
            let registry = ModelRegistry::from_slice(&bytes)?;
            info!(url = %url, pairs = ?registry.pairs(), "model registry loaded");
            self.registry = Some(registry);
        }
        self.registry()
    }

    /// Whether [`init`](Self::init) has succeeded.
    pub fn is_ready(&self) -> bool {
        self.registry.is_some()
    }

    /// The loaded registry.
    pub fn registry(&self) -> Result<&ModelRegistry> {
        self.registry
            .as_ref()
            .ok_or_else(|| VertoError::NotReady("model registry not loaded".into()))
    }

    /// Artifacts available for `pair`.
    pub fn artifacts_for(&self, pair: &LanguagePair) -> Result<Vec<ArtifactSpec>> {
        self.registry()?.artifacts_for(pair)
    }

    /// `<modelRoot>/<pair>/<fileName>`.
    pub fn artifact_url(&self, pair: &LanguagePair, spec: &ArtifactSpec) -> String {
        join_url(&self.settings.model_root, &[&pair.key(), &spec.file_name])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::HttpAssetFetcher;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pair(key: &str) -> LanguagePair {
        LanguagePair::try_from(key.to_string()).unwrap()
    }

    fn sample() -> Value {
        json!({
            "ende": {
                "model": {"name": "model.ende.bin", "size": 17},
                "lex": {"name": "lex.ende.bin"},
                "vocab": {"name": "vocab.deen.spm"},
                "qualityModel": {"name": "qe.ende.bin"},
                "trgvocab": {"name": "ignored.spm"}
            },
            "esen": {
                "model": {"name": "model.esen.bin"},
                "vocab": {"name": "vocab.esen.spm"}
            },
            "enfr": {
                "lex": {"name": "lex.enfr.bin"},
                "vocab": {"name": "vocab.enfr.spm"}
            }
        })
    }

    fn client_with(settings: RegistrySettings) -> RegistryClient {
        RegistryClient::new(settings, Arc::new(HttpAssetFetcher::default()))
    }

    #[test]
    fn artifacts_in_fixed_order_with_alignment() {
        let registry = ModelRegistry::from_json(sample()).unwrap();
        let specs = registry.artifacts_for(&pair("ende")).unwrap();
        let kinds: Vec<ArtifactKind> = specs.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, ArtifactKind::ALL.to_vec());
        assert_eq!(specs[0].alignment, 256);
        assert!(specs[1..].iter().all(|s| s.alignment == 64));
        assert_eq!(specs[2].file_name, "vocab.deen.spm");
    }

    #[test]
    fn optional_artifacts_may_be_absent() {
        let registry = ModelRegistry::from_json(sample()).unwrap();
        let specs = registry.artifacts_for(&pair("esen")).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].kind, ArtifactKind::Model);
        assert_eq!(specs[1].kind, ArtifactKind::Vocabulary);
    }

    #[test]
    fn missing_required_artifact() {
        let registry = ModelRegistry::from_json(sample()).unwrap();
        assert_matches!(
            registry.artifacts_for(&pair("enfr")),
            Err(VertoError::MissingArtifact { kind: ArtifactKind::Model, .. })
        );
    }

    #[test]
    fn unknown_pair() {
        let registry = ModelRegistry::from_json(sample()).unwrap();
        assert_matches!(
            registry.artifacts_for(&pair("deit")),
            Err(VertoError::UnknownPair(p)) if p.key() == "deit"
        );
    }

    #[test]
    fn metadata_is_preserved() {
        let registry = ModelRegistry::from_json(sample()).unwrap();
        assert_eq!(registry.raw(), &sample());
        let entry: ArtifactEntry =
            serde_json::from_value(json!({"name": "m.bin", "size": 5})).unwrap();
        assert_eq!(entry.metadata.get("size"), Some(&json!(5)));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert_matches!(ModelRegistry::from_json(json!([])), Err(VertoError::Registry(_)));
        assert_matches!(
            ModelRegistry::from_json(json!({"ende": 3})),
            Err(VertoError::Registry(_))
        );
        assert_matches!(
            ModelRegistry::from_json(json!({"ende": {"model": {"size": 1}}})),
            Err(VertoError::Registry(_))
        );
        assert_matches!(ModelRegistry::from_slice(b"not json"), Err(VertoError::Registry(_)));
    }

    #[test]
    fn skips_invalid_pair_keys() {
        let registry = ModelRegistry::from_json(json!({
            "version": {"model": {"name": "x"}},
            "ENDE": {"model": {"name": "m"}, "vocab": {"name": "v"}},
            "enDe": {"model": {"name": "m"}, "vocab": {"name": "v"}},
            "esen": {"model": {"name": "m"}, "vocab": {"name": "v"}}
        }))
        .unwrap();
        assert_eq!(registry.pairs(), vec![pair("esen")]);
        assert_matches!(
            registry.artifacts_for(&pair("ende")),
            Err(VertoError::UnknownPair(_))
        );
    }

    #[test]
    fn lookups_before_init_are_not_ready() {
        let client = client_with(RegistrySettings::default());
        assert!(!client.is_ready());
        assert_matches!(client.artifacts_for(&pair("ende")), Err(VertoError::NotReady(_)));
    }

    #[test]
    fn artifact_url_joins_segments() {
        let client = client_with(RegistrySettings {
            model_root: "https://cdn.example.org/models/".into(),
            ..RegistrySettings::default()
        });
        let spec = ArtifactSpec {
            kind: ArtifactKind::Model,
            file_name: "m.bin".into(),
            alignment: 256,
        };
        assert_eq!(
            client.artifact_url(&pair("ende"), &spec),
            "https://cdn.example.org/models/ende/m.bin"
        );
    }

    #[tokio::test]
    async fn init_fetches_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/registry.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample()))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_with(RegistrySettings {
            model_root: format!("{}/models", server.uri()),
            ..RegistrySettings::default()
        });
        let first = client.init().await.unwrap().raw().clone();
        let second = client.init().await.unwrap().raw().clone();
        assert_eq!(first, sample());
        assert_eq!(first, second);
        assert!(client.is_ready());
        assert_eq!(client.registry().unwrap().pairs().len(), 3);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_client_uninitialized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut client = client_with(RegistrySettings {
            model_root: server.uri(),
            ..RegistrySettings::default()
        });
        assert_matches!(client.init().await, Err(VertoError::Download { status: 500, .. }));
        assert!(!client.is_ready());
    }
}
