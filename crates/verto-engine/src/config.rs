//! Engine configuration.
//!
//! The per-model decoder configuration is fixed: greedy search with int8
//! quantized GEMM and soft alignment output. It is rendered as the YAML the
//! engine parses, one `key: value` per line with a single space after the
//! colon.

/// Decoder options passed to every model construction.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Beam width.
    pub beam_size: u32,
    /// Length normalization factor.
    pub normalize: f32,
    /// Per-word penalty.
    pub word_penalty: u32,
    /// Sentences longer than this many tokens are split.
    pub max_length_break: u32,
    /// Words per mini-batch.
    pub mini_batch_words: u32,
    /// Workspace size in MB.
    pub workspace_mb: u32,
    /// Maximum target length relative to source length.
    pub max_length_factor: f32,
    /// Skip cost computation.
    pub skip_cost: bool,
    /// CPU threads (0 = auto).
    pub cpu_threads: u32,
    /// Suppress engine logging.
    pub quiet: bool,
    /// GEMM precision.
    pub gemm_precision: &'static str,
    /// Alignment output mode.
    pub alignment: &'static str,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            beam_size: 1,
            normalize: 1.0,
            word_penalty: 0,
            max_length_break: 128,
            mini_batch_words: 1024,
            workspace_mb: 128,
            max_length_factor: 2.0,
            skip_cost: false,
            cpu_threads: 0,
            quiet: true,
            gemm_precision: "int8shiftAlphaAll",
            alignment: "soft",
        }
    }
}

impl EngineConfig {
    /// Render as the YAML document the engine expects.
    pub fn render(&self) -> String {
        format!(
            "beam-size: {}\n\
             normalize: {:.1}\n\
             word-penalty: {}\n\
             max-length-break: {}\n\
             mini-batch-words: {}\n\
             workspace: {}\n\
             max-length-factor: {:.1}\n\
             skip-cost: {}\n\
             cpu-threads: {}\n\
             quiet: {}\n\
             quiet-translation: {}\n\
             gemm-precision: {}\n\
             alignment: {}\n",
            self.beam_size,
            self.normalize,
            self.word_penalty,
            self.max_length_break,
            self.mini_batch_words,
            self.workspace_mb,
            self.max_length_factor,
            self.skip_cost,
            self.cpu_threads,
            self.quiet,
            self.quiet,
            self.gemm_precision,
            self.alignment,
        )
    }
}

/// Settings for the engine service itself, created once per process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Entries kept in the translation cache (0 disables it).
    pub cache_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { cache_size: 20_000 }
    }
}
