//! Error types for loading manifests and writing artifacts.
//!
//! Every variant is fatal for the invocation. Advisory problems found during
//! resolution are [`Diagnostic`](module_manifest_core::Diagnostic)s instead.

use std::path::PathBuf;

use module_manifest_core::ValidationError;
use thiserror::Error;

/// Errors that can occur while loading inputs or writing artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The manifest file does not exist.
    #[error("manifest file not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    /// The manifest is not valid JSON.
    #[error(
        "invalid JSON in manifest file {}: line {line}, column {column}: {message}",
        .path.display()
    )]
    InvalidJson {
        /// Manifest path.
        path: PathBuf,
        /// 1-based line of the syntax error.
        line: usize,
        /// 1-based column of the syntax error.
        column: usize,
        /// Parser message.
        message: String,
    },

    /// The manifest failed schema validation.
    #[error("invalid manifest: {}", join_errors(.0))]
    InvalidManifest(Vec<ValidationError>),

    /// A file could not be written.
    #[error("failed to write '{}': {source}", .path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias for results with [`ArtifactError`].
pub type Result<T> = std::result::Result<T, ArtifactError>;
