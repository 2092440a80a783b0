//! Scoped ownership of engine models.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::engine::{ModelHandle, TranslationEngine};

/// Owns one engine model and releases it when dropped.
///
/// Dropping a guard on any path (table cleared, load aborted, session torn
/// down) frees the engine-side model.
pub struct ModelGuard {
    engine: Arc<dyn TranslationEngine>,
    handle: ModelHandle,
    label: String,
}

impl ModelGuard {
    /// Take ownership of `handle`.
    pub fn new(
        engine: Arc<dyn TranslationEngine>,
        handle: ModelHandle,
        label: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            handle,
            label: label.into(),
        }
    }

    /// The engine handle, valid while the guard lives.
    pub fn handle(&self) -> ModelHandle {
        self.handle
    }

    /// Human-readable label (the language pair key).
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for ModelGuard {
    fn drop(&mut self) {
        debug!(model = %self.label, handle = self.handle.raw(), "releasing model");
        self.engine.release_model(self.handle);
    }
}

impl fmt::Debug for ModelGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelGuard")
            .field("handle", &self.handle)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
