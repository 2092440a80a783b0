//! The engine seam.
//!
//! The translation engine is a black box: it owns decoding, batching and
//! alignment extraction. The worker only constructs and releases model
//! objects and submits batches. Calls are synchronous and may block for the
//! full duration of a translation.

use verto_core::{Alignment, Result, TranslationOptions};

use crate::aligned::AlignedBuffer;
use crate::config::EngineConfig;

/// Opaque engine-owned model identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelHandle(u64);

impl ModelHandle {
    /// Wrap a raw engine id.
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// The raw engine id.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Aligned buffers for one model, moved into the engine on construction.
#[derive(Debug)]
pub struct ModelArtifacts {
    /// Model weights (256-byte aligned).
    pub model: AlignedBuffer,
    /// Lexical shortlist.
    pub lexicon: Option<AlignedBuffer>,
    /// Vocabularies; a single shared vocabulary for both directions.
    pub vocabularies: Vec<AlignedBuffer>,
    /// Quality-estimation model.
    pub quality_model: Option<AlignedBuffer>,
}

impl ModelArtifacts {
    /// Total bytes across all buffers.
    pub fn total_bytes(&self) -> usize {
        self.model.len()
            + self.lexicon.as_ref().map_or(0, AlignedBuffer::len)
            + self.vocabularies.iter().map(AlignedBuffer::len).sum::<usize>()
            + self.quality_model.as_ref().map_or(0, AlignedBuffer::len)
    }
}

/// Engine-side per-item response flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResponseOptions {
    /// Compute quality scores.
    pub quality_scores: bool,
    /// Compute alignments.
    pub alignment: bool,
    /// Input is HTML.
    pub html: bool,
}

impl From<TranslationOptions> for ResponseOptions {
    fn from(options: TranslationOptions) -> Self {
        Self {
            quality_scores: options.is_quality_scores,
            alignment: options.alignment(),
            html: options.is_html,
        }
    }
}

/// Per-sentence annotation in an engine response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SentenceAnnotation {
    /// Source tokens.
    pub source_tokens: Vec<String>,
    /// Target tokens.
    pub target_tokens: Vec<String>,
    /// Target × source soft alignment.
    pub alignment: Alignment,
}

/// Engine output for one input item.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineResponse {
    /// Source text as the engine received it.
    pub original_text: String,
    /// Translated text.
    pub translated_text: String,
    /// One entry per sentence, in order.
    pub sentences: Vec<SentenceAnnotation>,
}

/// Operations the worker needs from a translation engine.
///
/// Implementations must return exactly one response per source item, in
/// input order.
pub trait TranslationEngine: Send + Sync {
    /// Build a model from the fixed config and its aligned artifacts.
    fn construct_model(
        &self,
        config: &EngineConfig,
        artifacts: ModelArtifacts,
    ) -> Result<ModelHandle>;

    /// Free a model. Unknown handles are ignored.
    fn release_model(&self, handle: ModelHandle);

    /// Translate a batch with one model.
    fn translate(
        &self,
        model: ModelHandle,
        sources: &[String],
        options: &[ResponseOptions],
    ) -> Result<Vec<EngineResponse>>;

    /// Translate a batch through two chained models.
    fn translate_via_pivoting(
        &self,
        first: ModelHandle,
        second: ModelHandle,
        sources: &[String],
        options: &[ResponseOptions],
    ) -> Result<Vec<EngineResponse>>;
}
