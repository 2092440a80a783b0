//! # verto
//!
//! Translation worker binary. Reads one JSON host message per line on stdin
//! and writes one JSON reply per line on stdout; logs go to stderr.
//!
//! ```text
//! $ verto --model-root https://cdn.example.org/models
//! ["import"]
//! ["load_model", "en", "de"]
//! ["translate", "en", "de", ["Hello world."], [{"isHtml": false}]]
//! ```

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use verto_settings::VertoSettings;
use verto_worker::{TranslationSession, spawn_worker};

/// verto translation worker.
#[derive(Parser, Debug)]
#[command(name = "verto", version, about = "Translation worker speaking JSON lines on stdio")]
struct Cli {
    /// Settings file (defaults to `~/.verto/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Base URL holding `registry.json` and the model directories.
    #[arg(long)]
    model_root: Option<String>,

    /// Pivot language for pairs without a direct model.
    #[arg(long)]
    pivot: Option<String>,

    /// Log level when `RUST_LOG` is unset.
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Load settings, then let command-line flags override them.
    fn settings(&self) -> Result<VertoSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(verto_settings::settings_path);
        let mut settings = verto_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(root) = &self.model_root {
            settings.registry.model_root.clone_from(root);
        }
        if let Some(pivot) = &self.pivot {
            settings.translation.pivot_language = verto_core::language::normalize_code(pivot)
                .context("Invalid --pivot")?;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.json = true;
        }
        Ok(settings)
    }
}

/// Decode one stdin line; undecodable lines become `null` so the worker
/// still answers them with an `error_reply`.
fn parse_line(line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "invalid JSON on stdin");
            Some(Value::Null)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.settings()?;

    if settings.logging.json {
        verto_core::logging::init_json_subscriber(&settings.logging.level);
    } else {
        verto_core::logging::init_subscriber(&settings.logging.level);
    }
    tracing::info!(
        model_root = %settings.registry.model_root,
        pivot = %settings.translation.pivot_language,
        cache_size = settings.translation.cache_size,
        "starting verto worker"
    );

    let session = TranslationSession::with_echo_engine(&settings);
    let (handle, mut replies) = spawn_worker(session, settings.worker.queue_capacity);

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(reply) = replies.recv().await {
            let mut line = reply.to_json().to_string();
            line.push('\n');
            stdout.write_all(line.as_bytes()).await?;
            stdout.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if let Some(message) = parse_line(&line) {
            handle.send(message).await.context("Worker stopped")?;
        }
    }

    handle.shutdown().await;
    writer
        .await
        .context("Reply writer panicked")?
        .context("Failed to write stdout")?;
    tracing::info!("stdin closed, worker stopped");
    Ok(())
}
