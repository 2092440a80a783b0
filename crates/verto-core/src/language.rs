//! Language pair keys and pivot routing.
//!
//! A [`LanguagePair`] is the concatenation of two 2-letter codes (`"en"` +
//! `"de"` → `"ende"`) and identifies one directional model slot. When neither
//! side of a request is the pivot language, translation is chained through
//! two models: source → pivot and pivot → target.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VertoError};

/// Default pivot language code.
pub const DEFAULT_PIVOT_LANGUAGE: &str = "en";

/// Validate and normalize a 2-letter language code.
pub fn normalize_code(code: &str) -> Result<String> {
    let trimmed = code.trim();
    if trimmed.len() == 2 && trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_lowercase())
    } else {
        Err(VertoError::input(format!("invalid language code '{code}'")))
    }
}

/// Directional source/target pair, keyed by the concatenated codes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguagePair {
    source: String,
    target: String,
}

impl LanguagePair {
    /// Build a pair from two language codes.
    pub fn new(source: &str, target: &str) -> Result<Self> {
        Ok(Self {
            source: normalize_code(source)?,
            target: normalize_code(target)?,
        })
    }

    /// Source language code.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Target language code.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Registry / table key (`"ende"`).
    pub fn key(&self) -> String {
        format!("{}{}", self.source, self.target)
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.source, self.target)
    }
}

impl TryFrom<String> for LanguagePair {
    type Error = VertoError;

    fn try_from(key: String) -> Result<Self> {
        if key.len() != 4 || !key.is_ascii() {
            return Err(VertoError::input(format!("invalid language pair key '{key}'")));
        }
        Self::new(&key[..2], &key[2..])
    }
}

impl From<LanguagePair> for String {
    fn from(pair: LanguagePair) -> Self {
        pair.key()
    }
}

/// Whether translating `from` → `to` must be chained through `pivot`.
pub fn is_pivot_required(from: &str, to: &str, pivot: &str) -> bool {
    from != pivot && to != pivot
}

/// The models a request needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// A single model translates source → target.
    Direct(LanguagePair),
    /// Two chained models: source → pivot, then pivot → target.
    Pivot {
        /// Source → pivot leg.
        first: LanguagePair,
        /// Pivot → target leg.
        second: LanguagePair,
    },
}

impl Route {
    /// Resolve the route for `from` → `to` given the pivot language.
    pub fn resolve(from: &str, to: &str, pivot: &str) -> Result<Self> {
        let from = normalize_code(from)?;
        let to = normalize_code(to)?;
        let pivot = normalize_code(pivot)?;
        if is_pivot_required(&from, &to, &pivot) {
            Ok(Self::Pivot {
                first: LanguagePair::new(&from, &pivot)?,
                second: LanguagePair::new(&pivot, &to)?,
            })
        } else {
            Ok(Self::Direct(LanguagePair::new(&from, &to)?))
        }
    }

    /// Every pair this route needs, in translation order.
    pub fn pairs(&self) -> Vec<&LanguagePair> {
        match self {
            Self::Direct(pair) => vec![pair],
            Self::Pivot { first, second } => vec![first, second],
        }
    }

    /// The source → target pair the route serves.
    pub fn endpoints(&self) -> LanguagePair {
        match self {
            Self::Direct(pair) => pair.clone(),
            Self::Pivot { first, second } => LanguagePair {
                source: first.source.clone(),
                target: second.target.clone(),
            },
        }
    }

    /// Whether the route chains two models.
    pub fn is_pivot(&self) -> bool {
        matches!(self, Self::Pivot { .. })
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(pair) => write!(f, "{pair}"),
            Self::Pivot { first, second } => write!(f, "{first}+{second}"),
        }
    }
}
