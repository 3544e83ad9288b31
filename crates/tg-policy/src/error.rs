// error.rs: Error types for the policy subsystem.
//
// Every variant here is a configuration-time failure. Decisions made at
// request time are never errors; they are `Decision` values.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building or loading a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy document is structurally valid but semantically unusable.
    #[error("invalid policy configuration: {0}")]
    Config(String),

    /// A pattern is malformed and cannot be compiled.
    #[error("invalid {kind} pattern '{pattern}' for tool '{tool}': {reason}")]
    InvalidPattern {
        tool: String,
        kind: &'static str,
        pattern: String,
        reason: String,
    },

    /// The policy file could not be parsed in its declared format.
    #[error("failed to parse policy file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// The policy file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
