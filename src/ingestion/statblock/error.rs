//! Import Error Types
//!
//! Field-level parse failures never surface here: they resolve to declared
//! defaults. These errors cover the outer seams only (the input document and
//! the external collaborators).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised around the import pipeline.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Malformed stat block document: {0}")]
    MalformedInput(#[source] serde_json::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load spell catalog from {path}: {source}")]
    CatalogLoad {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Entity store rejected the creature: {0}")]
    Store(#[from] StoreError),
}

impl ImportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A catalog-side failure while resolving one spell name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Catalog lookup failed for '{name}': {reason}")]
    LookupFailed { name: String, reason: String },
}

/// Entity store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store rejected entity: {0}")]
    Rejected(String),
}

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// A non-fatal problem reported after an import completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportWarning {
    /// The catalog has no spell by this name; the spell was omitted.
    SpellNotFound { name: String },
    /// The catalog failed while resolving this name; the spell was omitted.
    CatalogFailure { name: String, reason: String },
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportWarning::SpellNotFound { name } => {
                write!(f, "spell '{name}' not found in catalog, skipped")
            }
            ImportWarning::CatalogFailure { name, reason } => {
                write!(f, "catalog lookup for '{name}' failed ({reason}), skipped")
            }
        }
    }
}
