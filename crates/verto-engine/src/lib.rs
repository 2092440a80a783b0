//! # verto-engine
//!
//! The boundary between the worker and the translation engine.
//!
//! - **Seam**: [`TranslationEngine`] constructs, releases and runs models
//! - **Buffers**: [`AlignedBuffer`] holds artifact bytes at the required alignment
//! - **Config**: [`EngineConfig`] renders the fixed decoder configuration
//! - **Ownership**: [`ModelGuard`] releases its model when dropped
//! - **Reference engine**: [`EchoEngine`] echoes input with identity alignments

#![deny(unsafe_code)]

pub mod aligned;
pub mod config;
pub mod echo;
pub mod engine;
pub mod guard;

pub use aligned::AlignedBuffer;
pub use config::{EngineConfig, ServiceConfig};
pub use echo::{EchoEngine, EngineStats, ModelInfo};
pub use engine::{
    EngineResponse, ModelArtifacts, ModelHandle, ResponseOptions, SentenceAnnotation,
    TranslationEngine,
};
pub use guard::ModelGuard;
