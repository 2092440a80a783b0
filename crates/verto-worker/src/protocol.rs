//! Host ↔ worker message protocol.
//!
//! Messages are JSON arrays whose first element is the command name:
//!
//! | Message | Reply |
//! |---|---|
//! | `["import"]` | `["import_reply", <registry>]` |
//! | `["load_model", from, to]` | `["load_model_reply", "Model successfully loaded"]` |
//! | `["translate", from, to, input, translateOptions]` | `["translate_reply", {"status": "ok", "results": [...]}]` |
//!
//! Translate failures are reported as `{"status": "error", "code", "message"}`
//! so the host can tell a failure from an empty result.

use serde::ser::{Serialize, SerializeTuple, Serializer};
use serde::Deserialize;
use serde_json::Value;
use verto_core::{TranslationOptions, TranslationResult, VertoError};

/// `load_model` success reply text.
pub const LOAD_SUCCESS: &str = "Model successfully loaded";
/// `load_model` failure reply text.
pub const LOAD_FAILURE: &str = "Model loading failed";

/// `import`.
pub const IMPORT: &str = "import";
/// `load_model`.
pub const LOAD_MODEL: &str = "load_model";
/// `translate`.
pub const TRANSLATE: &str = "translate";
/// Reply tag used when the message has no readable command name.
pub const ERROR: &str = "error";

/// A decoded host command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Bootstrap the engine and fetch the registry.
    Import,
    /// Load the models for a pair.
    LoadModel {
        /// Source language code.
        from: String,
        /// Target language code.
        to: String,
    },
    /// Translate a batch.
    Translate {
        /// Source language code.
        from: String,
        /// Target language code.
        to: String,
        /// Text blocks, in order.
        input: Vec<String>,
        /// Per-item options.
        options: Vec<TranslationOptions>,
    },
    /// A command this worker does not know.
    Unknown(String),
}

impl Command {
    /// Command name as sent by the host.
    pub fn name(&self) -> &str {
        match self {
            Self::Import => IMPORT,
            Self::LoadModel { .. } => LOAD_MODEL,
            Self::Translate { .. } => TRANSLATE,
            Self::Unknown(name) => name,
        }
    }

    /// Decode a host message.
    ///
    /// Missing `input` or `translateOptions` decode as empty lists and are
    /// rejected later by input validation.
    pub fn decode(message: &Value) -> Result<Self, VertoError> {
        let name = command_name(message)
            .ok_or_else(|| VertoError::Protocol("expected an array with a command name".into()))?;
        let args = message.as_array().map_or(&[][..], |a| &a[1..]);

        match name {
            IMPORT => Ok(Self::Import),
            LOAD_MODEL => Ok(Self::LoadModel {
                from: string_arg(args, 0, "from")?,
                to: string_arg(args, 1, "to")?,
            }),
            TRANSLATE => Ok(Self::Translate {
                from: string_arg(args, 0, "from")?,
                to: string_arg(args, 1, "to")?,
                input: list_arg(args, 2, "input")?,
                options: list_arg(args, 3, "translateOptions")?,
            }),
            other => Ok(Self::Unknown(other.to_string())),
        }
    }
}

/// The command name of a message, if it has one.
pub fn command_name(message: &Value) -> Option<&str> {
    message.as_array()?.first()?.as_str()
}

fn string_arg(args: &[Value], index: usize, name: &str) -> Result<String, VertoError> {
    args.get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| VertoError::Protocol(format!("'{name}' must be a string")))
}

fn list_arg<T: for<'de> Deserialize<'de>>(
    args: &[Value],
    index: usize,
    name: &str,
) -> Result<Vec<T>, VertoError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| VertoError::Protocol(format!("'{name}': {e}"))),
    }
}

/// Result of a `translate` (or unknown) command.
#[derive(Clone, Debug, PartialEq, serde::Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    /// Translation succeeded.
    Ok {
        /// One record per non-blank input item.
        results: Vec<TranslationResult>,
    },
    /// The command failed.
    Error {
        /// Machine-readable code.
        code: String,
        /// Human-readable description.
        message: String,
    },
}

impl Outcome {
    /// Error outcome for `err`.
    pub fn error(err: &VertoError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<Result<Vec<TranslationResult>, VertoError>> for Outcome {
    fn from(result: Result<Vec<TranslationResult>, VertoError>) -> Self {
        match result {
            Ok(results) => Self::Ok { results },
            Err(e) => Self::error(&e),
        }
    }
}

/// A reply posted to the host: `["<command>_reply", payload]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    /// Command this answers.
    pub command: String,
    /// Reply payload.
    pub payload: Value,
}

impl Reply {
    /// Reply to `command` with `payload`.
    pub fn new(command: impl Into<String>, payload: Value) -> Self {
        Self {
            command: command.into(),
            payload,
        }
    }

    /// Reply carrying a tagged outcome.
    pub fn outcome(command: impl Into<String>, outcome: &Outcome) -> Self {
        Self::new(command, serde_json::to_value(outcome).unwrap_or(Value::Null))
    }

    /// Failure reply in the shape `command` uses.
    pub fn failure(command: &str, err: &VertoError) -> Self {
        if command == LOAD_MODEL {
            Self::new(command, Value::String(LOAD_FAILURE.into()))
        } else {
            Self::outcome(command, &Outcome::error(err))
        }
    }

    /// `<command>_reply`.
    pub fn tag(&self) -> String {
        format!("{}_reply", self.command)
    }

    /// The reply as a JSON array.
    pub fn to_json(&self) -> Value {
        Value::Array(vec![Value::String(self.tag()), self.payload.clone()])
    }
}

impl Serialize for Reply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.tag())?;
        tuple.serialize_element(&self.payload)?;
        tuple.end()
    }
}
