//! In-process reference engine.
//!
//! Echoes every source item back as its translation with whitespace tokens
//! and an identity alignment. It enforces the same contract a native engine
//! does (aligned buffers, live handles, one response per item) and counts
//! every call, which makes it the engine of choice for tests and for running
//! the worker without native models.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;
use verto_core::{Alignment, ArtifactKind, Result, VertoError};

use crate::aligned::AlignedBuffer;
use crate::config::{EngineConfig, ServiceConfig};
use crate::engine::{
    EngineResponse, ModelArtifacts, ModelHandle, ResponseOptions, SentenceAnnotation,
    TranslationEngine,
};

/// What the engine recorded about a constructed model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    /// Total artifact bytes.
    pub bytes: usize,
    /// A lexical shortlist was supplied.
    pub has_lexicon: bool,
    /// A quality-estimation model was supplied.
    pub has_quality_model: bool,
    /// Number of vocabularies supplied.
    pub vocabularies: usize,
}

/// Call counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Models constructed.
    pub constructed: u64,
    /// Models released.
    pub released: u64,
    /// Direct translate calls.
    pub translate_calls: u64,
    /// Pivoted translate calls.
    pub pivot_calls: u64,
    /// Items served from the cache.
    pub cache_hits: u64,
}

type CacheKey = (Vec<ModelHandle>, String, bool, bool);

/// Identity translation engine.
pub struct EchoEngine {
    config: ServiceConfig,
    next_id: AtomicU64,
    models: Mutex<HashMap<ModelHandle, ModelInfo>>,
    cache: Mutex<HashMap<CacheKey, EngineResponse>>,
    stats: Mutex<EngineStats>,
    fail_construct: AtomicBool,
    fail_translate: AtomicBool,
}

impl EchoEngine {
    /// Create the engine service.
    pub fn new(config: ServiceConfig) -> Self {
        debug!(cache_size = config.cache_size, "creating echo engine");
        Self {
            config,
            next_id: AtomicU64::new(1),
            models: Mutex::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
            stats: Mutex::new(EngineStats::default()),
            fail_construct: AtomicBool::new(false),
            fail_translate: AtomicBool::new(false),
        }
    }

    /// Make subsequent model constructions fail.
    pub fn set_fail_construct(&self, fail: bool) {
        self.fail_construct.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent translations fail.
    pub fn set_fail_translate(&self, fail: bool) {
        self.fail_translate.store(fail, Ordering::SeqCst);
    }

    /// Number of models constructed and not yet released.
    pub fn live_models(&self) -> usize {
        self.models.lock().len()
    }

    /// Details of a live model.
    pub fn model_info(&self, handle: ModelHandle) -> Option<ModelInfo> {
        self.models.lock().get(&handle).cloned()
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> EngineStats {
        *self.stats.lock()
    }

    fn check_buffer(kind: ArtifactKind, buffer: &AlignedBuffer) -> Result<()> {
        if buffer.alignment() < kind.alignment() || !buffer.is_aligned() {
            return Err(VertoError::engine(format!(
                "{kind} buffer must be {}-byte aligned",
                kind.alignment()
            )));
        }
        Ok(())
    }

    fn check_batch(
        &self,
        handles: &[ModelHandle],
        sources: &[String],
        options: &[ResponseOptions],
    ) -> Result<()> {
        if self.fail_translate.load(Ordering::SeqCst) {
            return Err(VertoError::engine("translation failed"));
        }
        if sources.len() != options.len() {
            return Err(VertoError::engine(format!(
                "{} sources but {} response options",
                sources.len(),
                options.len()
            )));
        }
        let models = self.models.lock();
        if let Some(missing) = handles.iter().find(|h| !models.contains_key(*h)) {
            return Err(VertoError::engine(format!("unknown model handle {}", missing.raw())));
        }
        Ok(())
    }

    fn respond(
        &self,
        handles: &[ModelHandle],
        source: &str,
        options: ResponseOptions,
    ) -> EngineResponse {
        let key = (handles.to_vec(), source.to_string(), options.html, options.alignment);
        if self.config.cache_size > 0 {
            if let Some(hit) = self.cache.lock().get(&key) {
                self.stats.lock().cache_hits += 1;
                return hit.clone();
            }
        }

        // Each leg echoes; chaining composes the leg alignments.
        let mut sentences = echo_sentences(source);
        for _ in 1..handles.len() {
            for sentence in &mut sentences {
                sentence.alignment =
                    compose(&identity(sentence.target_tokens.len()), &sentence.alignment);
            }
        }
        if !options.alignment {
            for sentence in &mut sentences {
                sentence.alignment.clear();
            }
        }
        let response = EngineResponse {
            original_text: source.to_string(),
            translated_text: source.to_string(),
            sentences,
        };

        if self.config.cache_size > 0 {
            let mut cache = self.cache.lock();
            if cache.len() >= self.config.cache_size {
                cache.clear();
            }
            let _ = cache.insert(key, response.clone());
        }
        response
    }

    fn run(
        &self,
        handles: &[ModelHandle],
        sources: &[String],
        options: &[ResponseOptions],
    ) -> Result<Vec<EngineResponse>> {
        self.check_batch(handles, sources, options)?;
        Ok(sources
            .iter()
            .zip(options)
            .map(|(source, opts)| self.respond(handles, source, *opts))
            .collect())
    }
}

impl TranslationEngine for EchoEngine {
    fn construct_model(
        &self,
        config: &EngineConfig,
        artifacts: ModelArtifacts,
    ) -> Result<ModelHandle> {
        if self.fail_construct.load(Ordering::SeqCst) {
            return Err(VertoError::engine("model construction failed"));
        }
        if config.render().is_empty() {
            return Err(VertoError::engine("empty model configuration"));
        }
        Self::check_buffer(ArtifactKind::Model, &artifacts.model)?;
        if let Some(lexicon) = &artifacts.lexicon {
            Self::check_buffer(ArtifactKind::Lexicon, lexicon)?;
        }
        if artifacts.vocabularies.is_empty() {
            return Err(VertoError::engine("at least one vocabulary is required"));
        }
        for vocab in &artifacts.vocabularies {
            Self::check_buffer(ArtifactKind::Vocabulary, vocab)?;
        }
        if let Some(qe) = &artifacts.quality_model {
            Self::check_buffer(ArtifactKind::QualityModel, qe)?;
        }

        let handle = ModelHandle::from_raw(self.next_id.fetch_add(1, Ordering::SeqCst));
        let info = ModelInfo {
            bytes: artifacts.total_bytes(),
            has_lexicon: artifacts.lexicon.is_some(),
            has_quality_model: artifacts.quality_model.is_some(),
            vocabularies: artifacts.vocabularies.len(),
        };
        let _ = self.models.lock().insert(handle, info);
        self.stats.lock().constructed += 1;
        Ok(handle)
    }

    fn release_model(&self, handle: ModelHandle) {
        if self.models.lock().remove(&handle).is_some() {
            self.cache.lock().retain(|(handles, ..), _| !handles.contains(&handle));
            self.stats.lock().released += 1;
        }
    }

    fn translate(
        &self,
        model: ModelHandle,
        sources: &[String],
        options: &[ResponseOptions],
    ) -> Result<Vec<EngineResponse>> {
        let responses = self.run(&[model], sources, options)?;
        self.stats.lock().translate_calls += 1;
        Ok(responses)
    }

    fn translate_via_pivoting(
        &self,
        first: ModelHandle,
        second: ModelHandle,
        sources: &[String],
        options: &[ResponseOptions],
    ) -> Result<Vec<EngineResponse>> {
        let responses = self.run(&[first, second], sources, options)?;
        self.stats.lock().pivot_calls += 1;
        Ok(responses)
    }
}

/// Split into sentences after `.`, `!` or `?` and echo each one.
fn echo_sentences(text: &str) -> Vec<SentenceAnnotation> {
    let mut sentences = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for token in text.split_whitespace() {
        current.push(token.to_string());
        if token.ends_with(['.', '!', '?']) {
            sentences.push(echo_sentence(std::mem::take(&mut current)));
        }
    }
    if !current.is_empty() {
        sentences.push(echo_sentence(current));
    }
    sentences
}

fn echo_sentence(tokens: Vec<String>) -> SentenceAnnotation {
    SentenceAnnotation {
        alignment: identity(tokens.len()),
        target_tokens: tokens.clone(),
        source_tokens: tokens,
    }
}

fn identity(n: usize) -> Alignment {
    (0..n)
        .map(|row| (0..n).map(|col| if row == col { 1.0 } else { 0.0 }).collect())
        .collect()
}

/// `outer` (target × pivot) · `inner` (pivot × source).
fn compose(outer: &Alignment, inner: &Alignment) -> Alignment {
    let sources = inner.first().map_or(0, Vec::len);
    outer
        .iter()
        .map(|row| {
            (0..sources)
                .map(|s| {
                    row.iter()
                        .zip(inner)
                        .map(|(w, inner_row)| w * inner_row.get(s).copied().unwrap_or(0.0))
                        .sum()
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn artifacts(with_qe: bool) -> ModelArtifacts {
        ModelArtifacts {
            model: AlignedBuffer::from_bytes(&[1; 512], 256).unwrap(),
            lexicon: Some(AlignedBuffer::from_bytes(&[2; 64], 64).unwrap()),
            vocabularies: vec![AlignedBuffer::from_bytes(&[3; 32], 64).unwrap()],
            quality_model: with_qe.then(|| AlignedBuffer::from_bytes(&[4; 8], 64).unwrap()),
        }
    }

    fn engine() -> EchoEngine {
        EchoEngine::new(ServiceConfig::default())
    }

    fn opts(n: usize) -> Vec<ResponseOptions> {
        vec![
            ResponseOptions {
                alignment: true,
                ..ResponseOptions::default()
            };
            n
        ]
    }

    #[test]
    fn construct_records_model() {
        let engine = engine();
        let handle = engine.construct_model(&EngineConfig::default(), artifacts(true)).unwrap();
        let info = engine.model_info(handle).unwrap();
        assert_eq!(info.bytes, 512 + 64 + 32 + 8);
        assert!(info.has_lexicon);
        assert!(info.has_quality_model);
        assert_eq!(info.vocabularies, 1);
        assert_eq!(engine.live_models(), 1);
    }

    #[test]
    fn construct_rejects_under_aligned_weights() {
        let engine = engine();
        let mut bad = artifacts(false);
        bad.model = AlignedBuffer::from_bytes(&[1; 16], 64).unwrap();
        assert_matches!(
            engine.construct_model(&EngineConfig::default(), bad),
            Err(VertoError::Engine(_))
        );
        assert_eq!(engine.live_models(), 0);
    }

    #[test]
    fn construct_requires_vocabulary() {
        let engine = engine();
        let mut bad = artifacts(false);
        bad.vocabularies.clear();
        assert!(engine.construct_model(&EngineConfig::default(), bad).is_err());
    }

    #[test]
    fn translate_echoes_with_identity_alignment() {
        let engine = engine();
        let handle = engine.construct_model(&EngineConfig::default(), artifacts(false)).unwrap();
        let sources = vec!["Hello world. How are you?".to_string()];
        let responses = engine.translate(handle, &sources, &opts(1)).unwrap();

        assert_eq!(responses.len(), 1);
        let response = &responses[0];
        assert_eq!(response.translated_text, "Hello world. How are you?");
        assert_eq!(response.sentences.len(), 2);
        assert_eq!(response.sentences[0].source_tokens, vec!["Hello", "world."]);
        assert_eq!(response.sentences[1].target_tokens, vec!["How", "are", "you?"]);
        assert_eq!(response.sentences[0].alignment, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(engine.stats().translate_calls, 1);
    }

    #[test]
    fn translate_preserves_order() {
        let engine = engine();
        let handle = engine.construct_model(&EngineConfig::default(), artifacts(false)).unwrap();
        let sources: Vec<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();
        let responses = engine.translate(handle, &sources, &opts(3)).unwrap();
        let texts: Vec<&str> = responses.iter().map(|r| r.original_text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn translate_rejects_mismatched_options() {
        let engine = engine();
        let handle = engine.construct_model(&EngineConfig::default(), artifacts(false)).unwrap();
        let sources = vec!["a".to_string(), "b".to_string()];
        assert!(engine.translate(handle, &sources, &opts(1)).is_err());
    }

    #[test]
    fn translate_rejects_released_handle() {
        let engine = engine();
        let handle = engine.construct_model(&EngineConfig::default(), artifacts(false)).unwrap();
        engine.release_model(handle);
        let result = engine.translate(handle, &["a".to_string()], &opts(1));
        assert_matches!(
            result,
            Err(VertoError::Engine(msg)) if msg.contains("unknown model handle")
        );
    }

    #[test]
    fn pivot_composes_alignments() {
        let engine = engine();
        let first = engine.construct_model(&EngineConfig::default(), artifacts(false)).unwrap();
        let second = engine.construct_model(&EngineConfig::default(), artifacts(false)).unwrap();
        let responses = engine
            .translate_via_pivoting(first, second, &["x y".to_string()], &opts(1))
            .unwrap();
        assert_eq!(responses[0].sentences[0].alignment, identity(2));
        assert_eq!(engine.stats().pivot_calls, 1);
    }

    #[test]
    fn cache_serves_repeats() {
        let engine = engine();
        let handle = engine.construct_model(&EngineConfig::default(), artifacts(false)).unwrap();
        let sources = vec!["same".to_string()];
        let _ = engine.translate(handle, &sources, &opts(1)).unwrap();
        let _ = engine.translate(handle, &sources, &opts(1)).unwrap();
        assert_eq!(engine.stats().cache_hits, 1);
    }

    #[test]
    fn zero_cache_size_disables_cache() {
        let engine = EchoEngine::new(ServiceConfig { cache_size: 0 });
        let handle = engine.construct_model(&EngineConfig::default(), artifacts(false)).unwrap();
        let sources = vec!["same".to_string()];
        let _ = engine.translate(handle, &sources, &opts(1)).unwrap();
        let _ = engine.translate(handle, &sources, &opts(1)).unwrap();
        assert_eq!(engine.stats().cache_hits, 0);
    }

    #[test]
    fn failure_injection() {
        let engine = engine();
        engine.set_fail_construct(true);
        assert!(engine.construct_model(&EngineConfig::default(), artifacts(false)).is_err());
        engine.set_fail_construct(false);
        let handle = engine.construct_model(&EngineConfig::default(), artifacts(false)).unwrap();
        engine.set_fail_translate(true);
        assert!(engine.translate(handle, &["a".to_string()], &opts(1)).is_err());
    }

    #[test]
    fn compose_matrix_product() {
        let outer = vec![vec![0.5, 0.5]];
        let inner = vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]];
        assert_eq!(compose(&outer, &inner), vec![vec![0.5, 0.0, 0.5]]);
    }
}
