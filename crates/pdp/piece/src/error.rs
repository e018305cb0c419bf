//! Errors specific to piece commitment operations

use thiserror::Error;

use crate::PieceCommitment;

/// Result type for piece commitment operations
pub type Result<T> = std::result::Result<T, PieceError>;

/// Errors specific to piece commitment operations
#[derive(Error, Debug)]
pub enum PieceError {
    /// `finalize` was called before any data was written.
    #[error("no data written to the piece hasher")]
    Empty,

    /// The payload cannot form a valid tree.
    #[error("payload of {size} bytes is below the {min} byte structural minimum")]
    PayloadTooSmall {
        /// Number of bytes written.
        size: u64,
        /// Smallest accepted payload.
        min: u64,
    },

    /// The payload does not fit the largest representable tree.
    #[error("payload of {size} bytes exceeds the largest representable piece")]
    PayloadTooLarge {
        /// Number of bytes written.
        size: u64,
    },

    /// The input is not a CID at all.
    #[error("malformed piece commitment {input:?}: {reason}")]
    Malformed {
        /// The rejected input.
        input: String,
        /// Why decoding failed.
        reason: String,
    },

    /// The input is a CID, but not one that names a piece.
    #[error("unsupported piece commitment encoding: codec {codec:#x}, multihash {multihash:#x}")]
    UnsupportedEncoding {
        /// CID codec.
        codec: u64,
        /// Multihash code.
        multihash: u64,
    },

    /// The root is not a valid trunc254 node.
    #[error("piece root has its top two bits set")]
    InvalidRoot,

    /// The encoded tree height cannot describe a piece.
    #[error("invalid tree height {height}")]
    InvalidHeight {
        /// Decoded height.
        height: u8,
    },

    /// The encoded padding is inconsistent with the tree height.
    #[error("invalid padding {padding} for a tree of height {height}")]
    InvalidPadding {
        /// Decoded padding.
        padding: u64,
        /// Decoded height.
        height: u8,
    },

    /// Freshly computed commitment does not match the expected one.
    #[error("piece commitment mismatch: expected {expected}, computed {actual}")]
    Mismatch {
        /// The commitment the caller asked for.
        expected: PieceCommitment,
        /// The commitment of the bytes actually seen.
        actual: PieceCommitment,
    },
}

impl PieceError {
    pub(crate) fn malformed<S: Into<String>, R: ToString>(input: S, reason: R) -> Self {
        Self::Malformed {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error reports a data-integrity failure.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }
}
