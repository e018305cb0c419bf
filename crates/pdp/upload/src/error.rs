//! Upload error types.

use std::time::Duration;
use tessera_piece::{PieceCommitment, PieceError};
use tessera_primitives::{Address, Classify, ErrorKind};
use tessera_proofset::ProofSetError;
use tessera_provider::ProviderError;
use thiserror::Error;

/// Result type for uploads.
pub type Result<T> = std::result::Result<T, UploadError>;

/// Provider-facing step of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum UploadPhase {
    /// Announcing the piece.
    Check,
    /// Sending the bytes.
    Transfer,
    /// Waiting for the piece to be parked.
    Parking,
}

/// Errors from an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The payload is outside the accepted size range. Nothing was sent.
    #[error("invalid size {size}: must be between {min} and {max} bytes")]
    InvalidSize {
        /// Payload size.
        size: u64,
        /// Smallest accepted size.
        min: u64,
        /// Largest accepted size.
        max: u64,
    },

    /// The commitment could not be computed.
    #[error(transparent)]
    Piece(#[from] PieceError),

    /// Selecting, creating or adding to the proof set failed.
    #[error(transparent)]
    ProofSet(#[from] ProofSetError),

    /// A provider call failed.
    #[error("{phase} of {piece} at {provider} failed: {source}")]
    Provider {
        /// Where the upload was.
        phase: UploadPhase,
        /// The piece being uploaded.
        piece: PieceCommitment,
        /// The provider.
        provider: Address,
        /// Underlying failure.
        #[source]
        source: ProviderError,
    },

    /// The provider did not park the piece in time.
    #[error("piece {piece} not parked at {provider} within {timeout:?}")]
    PieceParkingTimeout {
        /// The piece.
        piece: PieceCommitment,
        /// The provider.
        provider: Address,
        /// The configured deadline.
        timeout: Duration,
    },

    /// Root addition confirmed no root id.
    #[error("root addition for {0} confirmed no root id")]
    MissingRootId(PieceCommitment),
}

impl Classify for UploadError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSize { .. } => ErrorKind::Validation,
            Self::Piece(e) => e.kind(),
            Self::ProofSet(e) => e.kind(),
            Self::Provider { source, .. } => source.kind(),
            Self::PieceParkingTimeout { .. } => ErrorKind::Timeout,
            Self::MissingRootId(_) => ErrorKind::Transient,
        }
    }
}
