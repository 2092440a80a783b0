//! Per-item translation options and results.
//!
//! Both types serialize to the camelCase shape the host exchanges
//! (`isQualityScores`, `sourceTokens`, ...).

use serde::{Deserialize, Serialize};

/// Probability mass over source tokens for one target token.
pub type Distribution = Vec<f32>;

/// Target-token × source-token matrix for one sentence.
pub type Alignment = Vec<Distribution>;

/// Flags for one input item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationOptions {
    /// Ask the engine for quality scores.
    pub is_quality_scores: bool,
    /// Treat the input as HTML.
    pub is_html: bool,
}

impl TranslationOptions {
    /// Alignment output is always requested.
    pub const fn alignment(self) -> bool {
        true
    }
}

/// Translation of one input item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    /// Original (trimmed) text.
    pub source: String,
    /// Translated text.
    pub target: String,
    /// One alignment matrix per sentence.
    pub alignments: Vec<Alignment>,
    /// Source tokens per sentence.
    pub source_tokens: Vec<Vec<String>>,
    /// Target tokens per sentence.
    pub target_tokens: Vec<Vec<String>>,
}

impl TranslationResult {
    /// Number of sentences in this result.
    pub fn sentence_count(&self) -> usize {
        self.alignments.len()
    }
}
