//! Constants used in piece commitment calculation.

/// Size of a tree node in bytes (one SHA-256 output, top two bits cleared).
pub const NODE_SIZE: usize = 32;

/// Unpadded bytes consumed by one Fr32 quad.
pub const QUAD_UNPADDED_SIZE: usize = 127;

/// Padded bytes produced by one Fr32 quad (four 254-bit field elements).
pub const QUAD_PADDED_SIZE: usize = 128;

/// Tree level at which one quad forms a complete subtree (4 leaves).
pub const QUAD_LEVEL: u8 = 2;

/// Smallest payload that forms a valid tree.
pub const MIN_PAYLOAD_SIZE: u64 = 65;

/// Smallest padded piece size.
pub const MIN_PADDED_PIECE_SIZE: u64 = QUAD_PADDED_SIZE as u64;

/// Height of the smallest tree.
pub const MIN_TREE_HEIGHT: u8 = QUAD_LEVEL;

/// Largest tree height whose padded size still fits a `u64`.
pub const MAX_TREE_HEIGHT: u8 = 58;

/// Multicodec for the legacy `fil-commitment-unsealed` CID.
pub const FIL_COMMITMENT_UNSEALED: u64 = 0xf101;

/// Multihash code for `sha2-256-trunc254-padded`.
pub const SHA2_256_TRUNC254_PADDED: u64 = 0x1012;

/// Multicodec for `raw`, used by the self-describing CID.
pub const RAW_CODEC: u64 = 0x55;

/// Multihash code for `fr32-sha256-trunc254-padbintree`.
pub const FR32_SHA256_TRUNC254_PADBINTREE: u64 = 0x1011;

/// Name of the legacy hash function as providers expect it in piece queries.
pub const LEGACY_HASH_NAME: &str = "sha2-256-trunc254-padded";
