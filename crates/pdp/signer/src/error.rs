//! Error types for signing operations.

use tessera_primitives::{Classify, ErrorKind};
use thiserror::Error;

/// Result type for signing operations.
pub type Result<T> = std::result::Result<T, SignerError>;

/// Errors produced while signing proof set operations.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The private key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// The underlying signer failed.
    #[error("signing failed: {0}")]
    Signing(#[from] alloy_signer::Error),

    /// A signature could not be decoded or recovered.
    #[error("signature recovery failed: {0}")]
    Recovery(String),
}

impl Classify for SignerError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKey(_) | Self::Recovery(_) => ErrorKind::Validation,
            Self::Signing(_) => ErrorKind::Transient,
        }
    }
}
