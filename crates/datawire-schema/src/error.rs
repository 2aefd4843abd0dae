//! Schema construction errors.

use thiserror::Error;

/// Error raised while parsing a schema document.
///
/// Carries the dotted path of the offending node (e.g.
/// `root.records.header`) so misconfigured documents are easy to pin down.
/// Runtime data problems never raise this; they surface as `FailedSchema`
/// items and warnings instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct InvalidSchema {
    /// Dotted path from the document root to the offending node.
    pub path: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl InvalidSchema {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> InvalidSchema {
        InvalidSchema {
            path: path.into(),
            message: message.into(),
        }
    }
}
