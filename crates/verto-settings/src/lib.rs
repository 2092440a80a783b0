//! # verto-settings
//!
//! Configuration for the verto translation worker.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`VertoSettings::default()`]
//! 2. **User file**: `~/.verto/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `VERTO_*` overrides (highest priority)
//!
//! The engine's decoder configuration is fixed and not part of these settings.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
