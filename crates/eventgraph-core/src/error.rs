//! Error types for index construction and report export.
//!
//! Per-item problems (an unresolvable location, a call without a usable
//! type argument) are never errors: the pipeline logs and skips them. Only
//! failures of the index as a whole and failures to write the report surface
//! here.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a code index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The target codebase could not be loaded at all.
    #[error("Failed to load code index from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Loading succeeded but no source documents were found.
    #[error("No source documents found under {0}")]
    NoDocuments(PathBuf),

    /// The requested root project does not exist in the codebase.
    #[error("Could not find project {0}")]
    ProjectNotFound(String),

    /// A single query against the index failed.
    #[error("Index query failed: {0}")]
    Query(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Errors raised while writing the report.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
