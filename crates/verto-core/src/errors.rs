//! Error taxonomy for the translation worker.
//!
//! Every variant carries a stable machine-readable code (see [`VertoError::code`])
//! so the protocol layer can report failures without leaking `Debug` output.

use thiserror::Error;

use crate::artifacts::ArtifactKind;
use crate::language::LanguagePair;

// ── Error code constants ────────────────────────────────────────────

/// Artifact download returned a non-success HTTP status.
pub const DOWNLOAD_ERROR: &str = "DOWNLOAD_ERROR";
/// Transport failure before an HTTP status was available.
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
/// Engine or registry not initialized yet.
pub const NOT_READY: &str = "NOT_READY";
/// Translation requested for a pair without a loaded model.
pub const NOT_LOADED: &str = "NOT_LOADED";
/// Empty or malformed input.
pub const INPUT_ERROR: &str = "INPUT_ERROR";
/// Opaque failure raised by the engine.
pub const ENGINE_ERROR: &str = "ENGINE_ERROR";
/// Pair absent from the model registry.
pub const UNKNOWN_PAIR: &str = "UNKNOWN_PAIR";
/// Registry entry lacks a required artifact.
pub const MISSING_ARTIFACT: &str = "MISSING_ARTIFACT";
/// Registry document could not be decoded.
pub const REGISTRY_ERROR: &str = "REGISTRY_ERROR";
/// Host message could not be decoded.
pub const PROTOCOL_ERROR: &str = "PROTOCOL_ERROR";

/// Errors raised while loading models or translating.
#[derive(Debug, Error)]
pub enum VertoError {
    /// HTTP response was not 2xx.
    #[error("Downloading {url} failed: HTTP {status} - {status_text}")]
    Download {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status.
        status_text: String,
    },

    /// Request never produced a response (DNS, connect, body read).
    #[error("Request to {url} failed: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Transport error description.
        message: String,
    },

    /// Registry or engine not initialized.
    #[error("not ready: {0}")]
    NotReady(String),

    /// No model loaded for the pair.
    #[error("Translation model '{0}' not loaded")]
    NotLoaded(LanguagePair),

    /// Input validation failure.
    #[error("{0}")]
    Input(String),

    /// Failure surfaced by the translation engine.
    #[error("engine error: {0}")]
    Engine(String),

    /// Pair has no entry in the registry.
    #[error("no registry entry for language pair '{0}'")]
    UnknownPair(LanguagePair),

    /// Registry entry exists but lacks a required artifact.
    #[error("registry entry '{pair}' has no '{kind}' artifact")]
    MissingArtifact {
        /// Pair being resolved.
        pair: LanguagePair,
        /// The absent artifact type.
        kind: ArtifactKind,
    },

    /// Registry JSON did not match the expected shape.
    #[error("invalid model registry: {0}")]
    Registry(String),

    /// Host message could not be decoded.
    #[error("invalid message: {0}")]
    Protocol(String),
}

impl VertoError {
    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Download { .. } => DOWNLOAD_ERROR,
            Self::Network { .. } => NETWORK_ERROR,
            Self::NotReady(_) => NOT_READY,
            Self::NotLoaded(_) => NOT_LOADED,
            Self::Input(_) => INPUT_ERROR,
            Self::Engine(_) => ENGINE_ERROR,
            Self::UnknownPair(_) => UNKNOWN_PAIR,
            Self::MissingArtifact { .. } => MISSING_ARTIFACT,
            Self::Registry(_) => REGISTRY_ERROR,
            Self::Protocol(_) => PROTOCOL_ERROR,
        }
    }

    /// Shorthand for an [`VertoError::Input`] error.
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    /// Shorthand for an [`VertoError::Engine`] error.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }
}

/// Result alias for worker operations.
pub type Result<T> = std::result::Result<T, VertoError>;
