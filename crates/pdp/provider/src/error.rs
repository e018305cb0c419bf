//! Provider error types.

use tessera_primitives::{Classify, ErrorKind};
use thiserror::Error;

/// Result type for provider calls.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors from calls to a storage provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced a response.
    #[error("{operation}: transport error: {source}")]
    Transport {
        /// The call that failed.
        operation: &'static str,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with an unexpected status.
    #[error("{operation}: HTTP {status}: {body}")]
    Http {
        /// The call that failed.
        operation: &'static str,
        /// Response status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The provider answered, but the response could not be understood.
    #[error("{operation}: invalid response: {reason}")]
    InvalidResponse {
        /// The call that failed.
        operation: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The provider does not have the requested piece.
    #[error("piece {0} not found")]
    PieceNotFound(String),

    /// A URL could not be built from the provider's endpoints.
    #[error("invalid provider url: {0}")]
    Url(#[from] url::ParseError),
}

impl ProviderError {
    pub(crate) fn transport(operation: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Transport { operation, source }
    }

    pub(crate) fn invalid(operation: &'static str, reason: impl ToString) -> Self {
        Self::InvalidResponse {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Whether a later attempt may succeed: transport failures, missing
    /// status records, throttling and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Http { status, .. } => *status == 404 || *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// HTTP status code, if the provider answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl Classify for ProviderError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Url(_) => ErrorKind::Validation,
            _ => ErrorKind::Transient,
        }
    }
}
