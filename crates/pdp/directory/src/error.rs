//! Directory error types.

use tessera_primitives::{Classify, ErrorKind};
use thiserror::Error;

/// Result type for directory queries.
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Errors from directory queries.
///
/// "Not found" is never an error here: lookups return `None` instead.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The registry or ledger could not be reached. Transient.
    #[error("directory unavailable during {operation}: {reason}")]
    Unavailable {
        /// The query that failed.
        operation: &'static str,
        /// Transport or RPC failure.
        reason: String,
    },

    /// A ledger snapshot could not be read or written.
    #[error("ledger snapshot error: {0}")]
    Snapshot(String),
}

impl DirectoryError {
    /// Construct an [`DirectoryError::Unavailable`].
    pub fn unavailable(operation: &'static str, reason: impl ToString) -> Self {
        Self::Unavailable {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Whether retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl Classify for DirectoryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable { .. } => ErrorKind::Transient,
            Self::Snapshot(_) => ErrorKind::Validation,
        }
    }
}
