//! Piece commitments (CommP).
//!
//! A piece commitment names a blob by the root of a binary SHA-256 (trunc254)
//! tree built over its Fr32-padded bytes. The same commitment is used as the
//! blob's identifier when uploading and as the integrity check when
//! downloading.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

// Re-export dependencies that are part of our public API
pub use cid;

pub mod constants;
pub mod error;

mod commitment;
mod hasher;
mod tree;

pub use commitment::{PieceCommitment, PieceSize};
pub use error::{PieceError, Result};
pub use hasher::PieceHasher;

use alloy_primitives::B256;

/// Compute the commitment of a whole buffer.
///
/// Any payload of at least [`constants::MIN_PAYLOAD_SIZE`] bytes is accepted;
/// upper limits are a caller policy.
pub fn compute(data: &[u8]) -> Result<PieceCommitment> {
    let size = PieceSize::for_payload(data.len() as u64)?;
    let root = tree::piece_root(data, size.height());
    PieceCommitment::new(B256::from(root), size)
}

/// Parse either wire form of a commitment.
pub fn parse(s: &str) -> Result<PieceCommitment> {
    s.parse()
}

/// The 32 bytes sent on-chain for `commitment`.
pub fn to_legacy_digest(commitment: &PieceCommitment) -> B256 {
    commitment.legacy_digest()
}

/// Check `data` against `expected`, failing with [`PieceError::Mismatch`].
///
/// A legacy `expected` carries no size, so payloads differing only in
/// trailing zero bytes within the same padded size verify alike. Pass the
/// self-describing form to pin the exact length.
pub fn verify(expected: &PieceCommitment, data: &[u8]) -> Result<()> {
    expected.verify(data)
}
