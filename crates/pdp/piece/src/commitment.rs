//! The piece commitment type and its two CID wire forms.
//!
//! - Legacy: CIDv1, codec `fil-commitment-unsealed`, multihash
//!   `sha2-256-trunc254-padded` carrying only the 32-byte root.
//! - Self-describing: CIDv1, codec `raw`, multihash
//!   `fr32-sha256-trunc254-padbintree` whose digest is
//!   `uvarint(padding) || height || root`.
//!
//! Both forms carry the same root, which is the only part sent on-chain.

use alloy_primitives::B256;
use cid::{Cid, Version, multihash::Multihash};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{fmt, str::FromStr};

use crate::{
    constants::*,
    error::{PieceError, Result},
    tree::{quad_count, tree_height},
};

/// Size information carried by the self-describing form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PieceSize {
    height: u8,
    padding: u64,
}

impl PieceSize {
    /// Create a size from a tree height and padding, validating that the pair
    /// describes a tree the payload could actually have produced.
    pub fn new(height: u8, padding: u64) -> Result<Self> {
        if !(MIN_TREE_HEIGHT..=MAX_TREE_HEIGHT).contains(&height) {
            return Err(PieceError::InvalidHeight { height });
        }

        let size = Self { height, padding };
        let unpadded = size.unpadded_size();
        let payload = unpadded
            .checked_sub(padding)
            .ok_or(PieceError::InvalidPadding { padding, height })?;

        // A payload that fits in half the tree would have produced a smaller one.
        if payload < MIN_PAYLOAD_SIZE || payload <= unpadded / 2 {
            return Err(PieceError::InvalidPadding { padding, height });
        }

        Ok(size)
    }

    /// Size of the smallest tree holding `payload` bytes.
    pub fn for_payload(payload: u64) -> Result<Self> {
        if payload < MIN_PAYLOAD_SIZE {
            return Err(PieceError::PayloadTooSmall {
                size: payload,
                min: MIN_PAYLOAD_SIZE,
            });
        }

        let height =
            tree_height(quad_count(payload)).ok_or(PieceError::PayloadTooLarge { size: payload })?;
        let unpadded = Self { height, padding: 0 }.unpadded_size();

        Ok(Self {
            height,
            padding: unpadded - payload,
        })
    }

    /// Tree height (`log2` of the leaf count).
    pub fn height(&self) -> u8 {
        self.height
    }

    /// Zero bytes appended to the payload to fill the unpadded piece.
    pub fn padding(&self) -> u64 {
        self.padding
    }

    /// Size of the Fr32-padded piece.
    pub fn padded_size(&self) -> u64 {
        (NODE_SIZE as u64) << self.height
    }

    /// Capacity of the piece before Fr32 padding.
    pub fn unpadded_size(&self) -> u64 {
        let padded = self.padded_size();
        padded - padded / QUAD_PADDED_SIZE as u64
    }

    /// Original payload length.
    pub fn payload_size(&self) -> u64 {
        self.unpadded_size() - self.padding
    }
}

/// Content-addressed identifier of a piece.
///
/// Commitments parsed from the legacy form know only their root; those
/// computed from data or parsed from the self-describing form also know
/// their [`PieceSize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PieceCommitment {
    root: B256,
    size: Option<PieceSize>,
}

impl PieceCommitment {
    /// Create a sized commitment.
    pub fn new(root: B256, size: PieceSize) -> Result<Self> {
        check_root(&root)?;
        Ok(Self {
            root,
            size: Some(size),
        })
    }

    /// Create a commitment from a bare 32-byte digest.
    pub fn from_legacy_digest(digest: B256) -> Result<Self> {
        check_root(&digest)?;
        Ok(Self {
            root: digest,
            size: None,
        })
    }

    /// The tree root.
    pub fn root(&self) -> B256 {
        self.root
    }

    /// The 32 bytes sent on-chain. Identical for both wire forms.
    pub fn legacy_digest(&self) -> B256 {
        self.root
    }

    /// Size information, if known.
    pub fn size(&self) -> Option<PieceSize> {
        self.size
    }

    /// Original payload length, if known.
    pub fn payload_size(&self) -> Option<u64> {
        self.size.map(|s| s.payload_size())
    }

    /// Padded piece size, if known.
    pub fn padded_size(&self) -> Option<u64> {
        self.size.map(|s| s.padded_size())
    }

    /// Drop size information, keeping only the root.
    pub fn to_legacy(&self) -> Self {
        Self {
            root: self.root,
            size: None,
        }
    }

    /// Whether `other` names the same piece.
    ///
    /// Roots must be equal; sizes are compared only when both sides know them.
    pub fn matches(&self, other: &Self) -> bool {
        self.root == other.root
            && match (self.size, other.size) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }

    /// Legacy CID (`fil-commitment-unsealed`).
    pub fn legacy_cid(&self) -> Cid {
        Cid::new_v1(
            FIL_COMMITMENT_UNSEALED,
            wrap(SHA2_256_TRUNC254_PADDED, self.root.as_slice()),
        )
    }

    /// Self-describing CID when the size is known, legacy CID otherwise.
    pub fn cid(&self) -> Cid {
        let Some(size) = self.size else {
            return self.legacy_cid();
        };

        let mut buf = unsigned_varint::encode::u64_buffer();
        let padding = unsigned_varint::encode::u64(size.padding, &mut buf);

        let mut digest = Vec::with_capacity(padding.len() + 1 + NODE_SIZE);
        digest.extend_from_slice(padding);
        digest.push(size.height);
        digest.extend_from_slice(self.root.as_slice());

        Cid::new_v1(RAW_CODEC, wrap(FR32_SHA256_TRUNC254_PADBINTREE, &digest))
    }

    /// Legacy CID string, as providers and contracts expect it.
    pub fn to_legacy_string(&self) -> String {
        self.legacy_cid().to_string()
    }

    /// Recompute the commitment of `data` and compare.
    ///
    /// Without a size only the root is compared, so trailing zero bytes that
    /// stay within the padded size go unnoticed.
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        let actual = crate::compute(data)?;
        if self.matches(&actual) {
            Ok(())
        } else {
            Err(PieceError::Mismatch {
                expected: *self,
                actual,
            })
        }
    }
}

#[allow(clippy::expect_used)]
fn wrap(code: u64, digest: &[u8]) -> Multihash<64> {
    // Digests here are at most 42 bytes.
    Multihash::wrap(code, digest).expect("digest fits in 64 bytes")
}

fn check_root(root: &B256) -> Result<()> {
    if root[NODE_SIZE - 1] & 0b1100_0000 != 0 {
        return Err(PieceError::InvalidRoot);
    }
    Ok(())
}

fn decode_self_describing(input: &str, digest: &[u8]) -> Result<PieceCommitment> {
    let (padding, rest) = unsigned_varint::decode::u64(digest)
        .map_err(|e| PieceError::malformed(input, format!("padding: {e}")))?;
    let (&height, root) = rest
        .split_first()
        .ok_or_else(|| PieceError::malformed(input, "missing tree height"))?;
    let root: [u8; NODE_SIZE] = root
        .try_into()
        .map_err(|_| PieceError::malformed(input, format!("root is {} bytes", root.len())))?;

    PieceCommitment::new(B256::from(root), PieceSize::new(height, padding)?)
}

impl TryFrom<&Cid> for PieceCommitment {
    type Error = PieceError;

    fn try_from(cid: &Cid) -> Result<Self> {
        if cid.version() != Version::V1 {
            return Err(PieceError::malformed(cid.to_string(), "not a CIDv1"));
        }

        let hash = cid.hash();
        match (cid.codec(), hash.code()) {
            (FIL_COMMITMENT_UNSEALED, SHA2_256_TRUNC254_PADDED) => {
                let digest: [u8; NODE_SIZE] = hash.digest().try_into().map_err(|_| {
                    PieceError::malformed(cid.to_string(), "digest is not 32 bytes")
                })?;
                Self::from_legacy_digest(B256::from(digest))
            }
            (RAW_CODEC, FR32_SHA256_TRUNC254_PADBINTREE) => {
                decode_self_describing(&cid.to_string(), hash.digest())
            }
            (codec, multihash) => Err(PieceError::UnsupportedEncoding { codec, multihash }),
        }
    }
}

impl From<PieceCommitment> for Cid {
    fn from(commitment: PieceCommitment) -> Self {
        commitment.cid()
    }
}

impl FromStr for PieceCommitment {
    type Err = PieceError;

    fn from_str(s: &str) -> Result<Self> {
        let cid = Cid::try_from(s.trim()).map_err(|e| PieceError::malformed(s, e))?;
        Self::try_from(&cid)
    }
}

impl fmt::Display for PieceCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.cid().fmt(f)
    }
}

impl Serialize for PieceCommitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PieceCommitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
