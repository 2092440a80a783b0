//! # verto-core
//!
//! Shared vocabulary for the verto translation worker.
//!
//! - **Language pairs**: [`LanguagePair`] keys and pivot [`Route`] resolution
//! - **Artifacts**: [`ArtifactKind`] with the fixed per-type byte alignment
//! - **Records**: [`TranslationOptions`] in, [`TranslationResult`] out
//! - **Errors**: [`VertoError`] with stable machine-readable codes
//! - **Logging**: subscriber setup and test capture

#![deny(unsafe_code)]

pub mod artifacts;
pub mod errors;
pub mod language;
pub mod logging;
pub mod translation;

pub use artifacts::ArtifactKind;
pub use errors::{Result, VertoError};
pub use language::{LanguagePair, Route};
pub use translation::{Alignment, Distribution, TranslationOptions, TranslationResult};
