//! Translation model manager.
//!
//! Owns the loaded-models table. Loading a pair replaces the whole table:
//! every guard is dropped (releasing its engine model) before the new route
//! is built, so the table only ever holds the legs of the most recent
//! request. All legs and all artifacts within a leg are fetched
//! concurrently; the new guards are inserted only once every leg has been
//! constructed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use tracing::{debug, info};
use verto_core::{ArtifactKind, LanguagePair, Result, Route, VertoError};
use verto_engine::{
    AlignedBuffer, EngineConfig, ModelArtifacts, ModelGuard, ModelHandle, TranslationEngine,
};

use crate::fetcher::AssetFetcher;
use crate::registry::{ArtifactSpec, RegistryClient};

/// Engine handles for a resolved route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteHandles {
    /// One model.
    Direct(ModelHandle),
    /// Source → pivot, then pivot → target.
    Pivot(ModelHandle, ModelHandle),
}

/// Builds, holds and releases engine models.
pub struct ModelManager {
    engine: Arc<dyn TranslationEngine>,
    fetcher: Arc<dyn AssetFetcher>,
    config: EngineConfig,
    pivot: String,
    loaded: BTreeMap<LanguagePair, ModelGuard>,
}

impl ModelManager {
    /// Create an empty manager routing through `pivot`.
    pub fn new(
        engine: Arc<dyn TranslationEngine>,
        fetcher: Arc<dyn AssetFetcher>,
        pivot: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            fetcher,
            config: EngineConfig::default(),
            pivot: pivot.into(),
            loaded: BTreeMap::new(),
        }
    }

    /// The engine models are constructed on.
    pub fn engine(&self) -> &Arc<dyn TranslationEngine> {
        &self.engine
    }

    /// Pivot language code.
    pub fn pivot(&self) -> &str {
        &self.pivot
    }

    /// Resolve `from` → `to` against the pivot language.
    pub fn route(&self, from: &str, to: &str) -> Result<Route> {
        Route::resolve(from, to, &self.pivot)
    }

    /// Replace the loaded models with those `from` → `to` needs.
    ///
    /// On failure the table is left empty and any leg already constructed
    /// for this call is released.
    pub async fn load_model(
        &mut self,
        registry: &RegistryClient,
        from: &str,
        to: &str,
    ) -> Result<Route> {
        if !self.loaded.is_empty() {
            debug!(count = self.loaded.len(), "releasing previously loaded models");
            self.loaded.clear();
        }

        let route = self.route(from, to)?;
        let start = Instant::now();
        let legs = try_join_all(
            route
                .pairs()
                .into_iter()
                .map(|pair| self.build_leg(registry, pair)),
        )
        .await?;

        for (pair, guard) in route.pairs().into_iter().zip(legs) {
            let _ = self.loaded.insert(pair.clone(), guard);
        }
        info!(
            route = %route,
            pivot = route.is_pivot(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "model loaded"
        );
        Ok(route)
    }

    async fn build_leg(
        &self,
        registry: &RegistryClient,
        pair: &LanguagePair,
    ) -> Result<ModelGuard> {
        let specs = registry.artifacts_for(pair)?;
        let buffers = try_join_all(
            specs
                .iter()
                .map(|spec| self.fetch_aligned(registry, pair, spec)),
        )
        .await?;

        let mut model = None;
        let mut lexicon = None;
        let mut vocabularies = Vec::new();
        let mut quality_model = None;
        for (kind, buffer) in buffers {
            match kind {
                ArtifactKind::Model => model = Some(buffer),
                ArtifactKind::Lexicon => lexicon = Some(buffer),
                ArtifactKind::Vocabulary => vocabularies.push(buffer),
                ArtifactKind::QualityModel => quality_model = Some(buffer),
            }
        }
        let model = model.ok_or_else(|| VertoError::MissingArtifact {
            pair: pair.clone(),
            kind: ArtifactKind::Model,
        })?;
        let artifacts = ModelArtifacts {
            model,
            lexicon,
            vocabularies,
            quality_model,
        };

        let bytes = artifacts.total_bytes();
        let handle = self.engine.construct_model(&self.config, artifacts)?;
        debug!(pair = %pair, handle = handle.raw(), bytes, "constructed model");
        Ok(ModelGuard::new(Arc::clone(&self.engine), handle, pair.key()))
    }

    async fn fetch_aligned(
        &self,
        registry: &RegistryClient,
        pair: &LanguagePair,
        spec: &ArtifactSpec,
    ) -> Result<(ArtifactKind, AlignedBuffer)> {
        let url = registry.artifact_url(pair, spec);
        let bytes = self.fetcher.fetch(&url).await?;
        let buffer = AlignedBuffer::from_bytes(&bytes, spec.alignment)?;
        debug!(
            pair = %pair,
            kind = %spec.kind,
            bytes = buffer.len(),
            alignment = spec.alignment,
            "aligned artifact"
        );
        Ok((spec.kind, buffer))
    }

    /// Handle for a loaded pair.
    pub fn get(&self, pair: &LanguagePair) -> Option<ModelHandle> {
        self.loaded.get(pair).map(ModelGuard::handle)
    }

    /// Handles for every leg of `route`, or `NotLoaded` for the first
    /// missing one.
    pub fn handles(&self, route: &Route) -> Result<RouteHandles> {
        let lookup = |pair: &LanguagePair| {
            self.get(pair)
                .ok_or_else(|| VertoError::NotLoaded(pair.clone()))
        };
        match route {
            Route::Direct(pair) => Ok(RouteHandles::Direct(lookup(pair)?)),
            Route::Pivot { first, second } => {
                Ok(RouteHandles::Pivot(lookup(first)?, lookup(second)?))
            }
        }
    }

    /// Keys of the loaded pairs, sorted.
    pub fn loaded_keys(&self) -> Vec<String> {
        self.loaded.keys().map(LanguagePair::key).collect()
    }

    /// Number of loaded models.
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    /// Whether no model is loaded.
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Release every loaded model.
    pub fn clear(&mut self) {
        self.loaded.clear();
    }
}
