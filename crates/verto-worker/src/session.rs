//! Per-worker translation session.

use std::sync::Arc;

use serde_json::Value;
use verto_core::{Result, Route, TranslationOptions, TranslationResult, VertoError};
use verto_engine::{EchoEngine, ServiceConfig, TranslationEngine};
use verto_settings::VertoSettings;

use crate::fetcher::{AssetFetcher, HttpAssetFetcher};
use crate::models::ModelManager;
use crate::orchestrator;
use crate::registry::RegistryClient;

/// Everything one worker owns: the registry, the loaded models and the
/// engine they live on.
pub struct TranslationSession {
    registry: RegistryClient,
    models: ModelManager,
}

impl TranslationSession {
    /// Build a session from settings with explicit engine and fetcher.
    pub fn new(
        settings: &VertoSettings,
        engine: Arc<dyn TranslationEngine>,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Self {
        Self {
            registry: RegistryClient::new(settings.registry.clone(), Arc::clone(&fetcher)),
            models: ModelManager::new(engine, fetcher, settings.translation.pivot_language.clone()),
        }
    }

    /// Session over HTTP with the in-process echo engine.
    pub fn with_echo_engine(settings: &VertoSettings) -> Self {
        let engine = Arc::new(EchoEngine::new(ServiceConfig {
            cache_size: settings.translation.cache_size,
        }));
        let fetcher = Arc::new(HttpAssetFetcher::new(&settings.fetch));
        Self::new(settings, engine, fetcher)
    }

    /// Fetch the registry and return it as fetched.
    pub async fn import(&mut self) -> Result<Value> {
        Ok(self.registry.init().await?.raw().clone())
    }

    /// Whether the registry has been fetched.
    pub fn is_imported(&self) -> bool {
        self.registry.is_ready()
    }

    /// Load the models `from` → `to` needs, replacing any loaded ones.
    pub async fn load_model(&mut self, from: &str, to: &str) -> Result<Route> {
        if !self.is_imported() {
            self.models.clear();
            return Err(VertoError::NotReady("engine not imported".into()));
        }
        self.models.load_model(&self.registry, from, to).await
    }

    /// Translate with the currently loaded models.
    pub fn translate(
        &self,
        from: &str,
        to: &str,
        input: &[String],
        options: &[TranslationOptions],
    ) -> Result<Vec<TranslationResult>> {
        orchestrator::translate(&self.models, from, to, input, options)
    }

    /// The registry client.
    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    /// The model manager.
    pub fn models(&self) -> &ModelManager {
        &self.models
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MODEL_ROOT, MemoryFetcher};
    use assert_matches::assert_matches;

    fn session() -> (Arc<EchoEngine>, TranslationSession) {
        let mut settings = VertoSettings::default();
        settings.registry.model_root = MODEL_ROOT.into();
        let engine = Arc::new(EchoEngine::new(ServiceConfig::default()));
        let fetcher = Arc::new(MemoryFetcher::with_sample_models());
        let session = TranslationSession::new(&settings, engine.clone(), fetcher);
        (engine, session)
    }

    #[tokio::test]
    async fn import_returns_registry() {
        let (_engine, mut session) = session();
        assert!(!session.is_imported());
        let registry = session.import().await.unwrap();
        assert!(registry.get("ende").is_some());
        assert!(session.is_imported());
    }

    #[tokio::test]
    async fn load_requires_import() {
        let (_engine, mut session) = session();
        assert_matches!(session.load_model("en", "de").await, Err(VertoError::NotReady(_)));
    }

    #[tokio::test]
    async fn load_then_translate() {
        let (engine, mut session) = session();
        let _ = session.import().await.unwrap();
        let _ = session.load_model("es", "de").await.unwrap();
        assert_eq!(session.models().loaded_keys(), vec!["ende", "esen"]);

        let results = session
            .translate("es", "de", &["hola".to_string()], &[TranslationOptions::default()])
            .unwrap();
        assert_eq!(results[0].target, "hola");
        assert_eq!(engine.stats().pivot_calls, 1);
    }
}
