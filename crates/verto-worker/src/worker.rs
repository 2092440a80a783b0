//! The worker command loop.
//!
//! Host messages are queued on a bounded MPSC channel and drained by a
//! single consumer task that owns the [`TranslationSession`]. Each command
//! runs to completion before the next is dequeued, which serializes model
//! loading against translation and against other loads.

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use verto_core::{LanguagePair, Result, TranslationOptions, VertoError};

use crate::protocol::{self, Command, LOAD_FAILURE, LOAD_SUCCESS, Outcome, Reply};
use crate::session::TranslationSession;

/// Worker lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Nothing imported yet.
    Uninitialized,
    /// Registry fetched, no model loaded.
    EngineImported,
    /// Models for the pair are loaded.
    ModelLoaded(LanguagePair),
    /// A translation for the pair is running.
    Translating(LanguagePair),
}

/// Dispatches commands against a session and tracks the state machine.
pub struct Worker {
    session: TranslationSession,
    state: WorkerState,
}

impl Worker {
    /// Wrap a fresh session.
    pub fn new(session: TranslationSession) -> Self {
        Self {
            session,
            state: WorkerState::Uninitialized,
        }
    }

    /// Current state.
    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    /// The owned session.
    pub fn session(&self) -> &TranslationSession {
        &self.session
    }

    /// Decode and handle one raw host message.
    pub async fn handle_message(&mut self, message: &Value) -> Reply {
        match Command::decode(message) {
            Ok(command) => self.handle(command).await,
            Err(e) => {
                let name = protocol::command_name(message).unwrap_or(protocol::ERROR);
                warn!(command = name, error = %e, "rejected host message");
                Reply::failure(name, &e)
            }
        }
    }

    /// Handle one decoded command.
    pub async fn handle(&mut self, command: Command) -> Reply {
        debug!(command = command.name(), state = ?self.state, "received command");
        match command {
            Command::Import => self.import().await,
            Command::LoadModel { from, to } => self.load_model(&from, &to).await,
            Command::Translate {
                from,
                to,
                input,
                options,
            } => self.translate(&from, &to, &input, &options),
            Command::Unknown(name) => {
                warn!(command = %name, "unknown command");
                let err = VertoError::Protocol(format!("unknown command '{name}'"));
                Reply::outcome(name, &Outcome::error(&err))
            }
        }
    }

    async fn import(&mut self) -> Reply {
        match self.session.import().await {
            Ok(registry) => {
                if self.state == WorkerState::Uninitialized {
                    self.state = WorkerState::EngineImported;
                }
                info!("engine imported");
                Reply::new(protocol::IMPORT, registry)
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "import failed");
                Reply::failure(protocol::IMPORT, &e)
            }
        }
    }

    async fn load_model(&mut self, from: &str, to: &str) -> Reply {
        let payload = match self.session.load_model(from, to).await {
            Ok(route) => {
                let pair = route.endpoints();
                info!(pair = %pair, route = %route, "model successfully loaded");
                self.state = WorkerState::ModelLoaded(pair);
                LOAD_SUCCESS
            }
            Err(e) => {
                warn!(from, to, error = %e, code = e.code(), "model loading failed");
                if self.session.is_imported() {
                    self.state = WorkerState::EngineImported;
                }
                LOAD_FAILURE
            }
        };
        Reply::new(protocol::LOAD_MODEL, Value::String(payload.to_string()))
    }

    fn translate(
        &mut self,
        from: &str,
        to: &str,
        input: &[String],
        options: &[TranslationOptions],
    ) -> Reply {
        let previous = self.state.clone();
        let result = match &previous {
            WorkerState::Uninitialized => Err(VertoError::NotReady("engine not imported".into())),
            WorkerState::ModelLoaded(pair) => {
                self.state = WorkerState::Translating(pair.clone());
                self.session.translate(from, to, input, options)
            }
            _ => self.session.translate(from, to, input, options),
        };
        self.state = previous;

        if let Err(e) = &result {
            warn!(from, to, error = %e, code = e.code(), "translation failed");
        }
        Reply::outcome(protocol::TRANSLATE, &Outcome::from(result))
    }
}

/// Sending side of a spawned worker.
pub struct WorkerHandle {
    tx: mpsc::Sender<Value>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Queue a raw host message.
    pub async fn send(&self, message: Value) -> Result<()> {
        self.tx.send(message).await.map_err(|_| {
            if self.task.is_finished() {
                VertoError::Protocol("worker exited".into())
            } else {
                VertoError::Protocol("worker channel closed".into())
            }
        })
    }

    /// Queue a decoded command.
    pub async fn send_command(&self, command: &Command) -> Result<()> {
        self.send(command_message(command)).await
    }

    /// Stop accepting messages and wait for queued ones to finish.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            warn!(error = %e, "worker task ended abnormally");
        }
    }
}

/// Encode a command the way the host sends it.
pub fn command_message(command: &Command) -> Value {
    match command {
        Command::Import => serde_json::json!([protocol::IMPORT]),
        Command::LoadModel { from, to } => serde_json::json!([protocol::LOAD_MODEL, from, to]),
        Command::Translate {
            from,
            to,
            input,
            options,
        } => serde_json::json!([protocol::TRANSLATE, from, to, input, options]),
        Command::Unknown(name) => serde_json::json!([name]),
    }
}

/// Spawn the command loop on the current runtime.
///
/// Returns the sending handle and the stream of replies, one per message in
/// the order the messages were queued.
pub fn spawn_worker(
    session: TranslationSession,
    queue_capacity: usize,
) -> (WorkerHandle, mpsc::Receiver<Reply>) {
    let capacity = queue_capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    let (reply_tx, reply_rx) = mpsc::channel(capacity);
    let task = tokio::spawn(run_worker(Worker::new(session), rx, reply_tx));
    (WorkerHandle { tx, task }, reply_rx)
}

async fn run_worker(
    mut worker: Worker,
    mut rx: mpsc::Receiver<Value>,
    replies: mpsc::Sender<Reply>,
) {
    while let Some(message) = rx.recv().await {
        let reply = worker.handle_message(&message).await;
        debug!(reply = %reply.tag(), "posting reply");
        if replies.send(reply).await.is_err() {
            debug!("reply receiver dropped, stopping worker");
            break;
        }
    }
    debug!("worker loop finished");
}
