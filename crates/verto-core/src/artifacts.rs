//! Artifact types and their required byte alignment.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One kind of model file listed in the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Primary model weights.
    #[serde(rename = "model")]
    Model,
    /// Lexical shortlist.
    #[serde(rename = "lex")]
    Lexicon,
    /// Shared source/target vocabulary.
    #[serde(rename = "vocab")]
    Vocabulary,
    /// Quality-estimation model.
    #[serde(rename = "qualityModel")]
    QualityModel,
}

impl ArtifactKind {
    /// All artifact kinds in engine-argument order.
    pub const ALL: [Self; 4] = [
        Self::Model,
        Self::Lexicon,
        Self::Vocabulary,
        Self::QualityModel,
    ];

    /// Name used as the key in `registry.json`.
    pub fn registry_name(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Lexicon => "lex",
            Self::Vocabulary => "vocab",
            Self::QualityModel => "qualityModel",
        }
    }

    /// Look up a kind by its registry name.
    pub fn from_registry_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.registry_name() == name)
    }

    /// Byte alignment the engine requires for this artifact's buffer.
    pub fn alignment(self) -> usize {
        match self {
            Self::Model => 256,
            Self::Lexicon | Self::Vocabulary | Self::QualityModel => 64,
        }
    }

    /// Whether a model cannot be constructed without this artifact.
    pub fn is_required(self) -> bool {
        matches!(self, Self::Model | Self::Vocabulary)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.registry_name())
    }
}
