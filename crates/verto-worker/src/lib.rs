//! # verto-worker
//!
//! Loads translation models and serves translation requests for a host.
//!
//! - **Fetcher**: [`AssetFetcher`] downloads artifacts; [`HttpAssetFetcher`] over `reqwest`
//! - **Registry**: [`RegistryClient`] resolves a pair to its artifact files
//! - **Models**: [`ModelManager`] builds direct or pivoted routes on the engine
//! - **Orchestrator**: validates, marshals and runs translation batches
//! - **Session**: [`TranslationSession`] owns all per-worker state
//! - **Protocol**: [`Command`] in, [`Reply`] out, one command at a time via [`spawn_worker`]

#![deny(unsafe_code)]

pub mod fetcher;
pub mod models;
pub mod orchestrator;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fetcher::{AssetFetcher, HttpAssetFetcher};
pub use models::{ModelManager, RouteHandles};
pub use protocol::{Command, Outcome, Reply};
pub use registry::{ArtifactEntry, ArtifactSpec, ModelRegistry, RegistryClient};
pub use session::TranslationSession;
pub use worker::{Worker, WorkerHandle, WorkerState, spawn_worker};
