//! Fr32 expansion and the padded binary tree over SHA-256 (trunc254).
//!
//! Payload bytes are consumed in 127-byte quads. Each quad expands to four
//! 32-byte leaves whose top two bits are zero, so every leaf is a valid
//! field element. Internal nodes are `sha256(left || right)` with the top two
//! bits of the output cleared. Trees are padded on the right with subtrees of
//! zero leaves up to the next power of two.

use sha2::{Digest, Sha256};
use std::sync::LazyLock;

use crate::constants::*;

/// A tree node.
pub(crate) type Node = [u8; NODE_SIZE];

/// Subtree roots at or above this level are split across the rayon pool.
const PARALLEL_MIN_LEVEL: u8 = 10;

/// `ZERO_COMMS[i]` is the root of a subtree of `2^i` zero leaves.
static ZERO_COMMS: LazyLock<[Node; MAX_TREE_HEIGHT as usize + 1]> = LazyLock::new(|| {
    let mut comms = [[0u8; NODE_SIZE]; MAX_TREE_HEIGHT as usize + 1];
    for level in 1..comms.len() {
        comms[level] = hash_pair(&comms[level - 1], &comms[level - 1]);
    }
    comms
});

/// Root of a subtree of `2^level` zero leaves.
#[inline]
pub(crate) fn zero_comm(level: u8) -> Node {
    ZERO_COMMS[level as usize]
}

/// Hash two sibling nodes into their parent.
#[inline(always)]
pub(crate) fn hash_pair(left: &Node, right: &Node) -> Node {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let mut out: Node = hasher.finalize().into();
    out[NODE_SIZE - 1] &= 0b0011_1111;
    out
}

/// Expand one 127-byte quad into 128 bytes, inserting two zero bits after
/// every 254 payload bits.
pub(crate) fn expand_quad(input: &[u8; QUAD_UNPADDED_SIZE], out: &mut [u8; QUAD_PADDED_SIZE]) {
    out[..31].copy_from_slice(&input[..31]);
    out[31] = input[31] & 0x3f;

    // Second element starts 2 bits into byte 31.
    let mut carry = input[31] >> 6;
    for i in 32..64 {
        let v = input[i];
        out[i] = (v << 2) | carry;
        carry = v >> 6;
    }
    out[63] &= 0x3f;

    // Third element starts 4 bits into byte 63.
    let mut carry = input[63] >> 4;
    for i in 64..96 {
        let v = input[i];
        out[i] = (v << 4) | carry;
        carry = v >> 4;
    }
    out[95] &= 0x3f;

    // Fourth element starts 6 bits into byte 95.
    let mut carry = input[95] >> 2;
    for i in 96..127 {
        let v = input[i];
        out[i] = (v << 6) | carry;
        carry = v >> 2;
    }
    out[127] = carry & 0x3f;
}

/// Root of the four-leaf subtree formed by one (zero-padded) quad.
pub(crate) fn quad_root(quad: &[u8; QUAD_UNPADDED_SIZE]) -> Node {
    let mut expanded = [0u8; QUAD_PADDED_SIZE];
    expand_quad(quad, &mut expanded);

    let mut leaves = [[0u8; NODE_SIZE]; 4];
    for (leaf, chunk) in leaves.iter_mut().zip(expanded.chunks_exact(NODE_SIZE)) {
        leaf.copy_from_slice(chunk);
    }

    let left = hash_pair(&leaves[0], &leaves[1]);
    let right = hash_pair(&leaves[2], &leaves[3]);
    hash_pair(&left, &right)
}

/// Number of quads needed to hold `payload` bytes.
#[inline]
pub(crate) fn quad_count(payload: u64) -> u64 {
    payload.div_ceil(QUAD_UNPADDED_SIZE as u64)
}

/// Height of the smallest power-of-two tree holding `quads` quads, or `None`
/// when it would exceed [`MAX_TREE_HEIGHT`].
pub(crate) fn tree_height(quads: u64) -> Option<u8> {
    let padded = quads
        .checked_mul(QUAD_PADDED_SIZE as u64)?
        .checked_next_power_of_two()?
        .max(MIN_PADDED_PIECE_SIZE);
    let leaves = padded / NODE_SIZE as u64;
    let height = leaves.trailing_zeros() as u8;
    (height <= MAX_TREE_HEIGHT).then_some(height)
}

/// Root of the full padded tree over `data`, hashing large subtrees in
/// parallel.
pub(crate) fn piece_root(data: &[u8], height: u8) -> Node {
    let quads = quad_count(data.len() as u64);
    subtree_root(data, quads, height, 0)
}

/// Root of the subtree at `level` with the given `index` among its level.
///
/// Subtrees lying entirely past the payload are zero subtrees and come from
/// the precomputed table.
fn subtree_root(data: &[u8], quads: u64, level: u8, index: u64) -> Node {
    let first_quad = index << (level - QUAD_LEVEL);
    if first_quad >= quads {
        return zero_comm(level);
    }

    if level == QUAD_LEVEL {
        return quad_root(&read_quad(data, first_quad));
    }

    let (left, right) = if level >= PARALLEL_MIN_LEVEL {
        rayon::join(
            || subtree_root(data, quads, level - 1, index * 2),
            || subtree_root(data, quads, level - 1, index * 2 + 1),
        )
    } else {
        (
            subtree_root(data, quads, level - 1, index * 2),
            subtree_root(data, quads, level - 1, index * 2 + 1),
        )
    };

    hash_pair(&left, &right)
}

/// Copy quad `index` out of `data`, zero-filling past the end.
fn read_quad(data: &[u8], index: u64) -> [u8; QUAD_UNPADDED_SIZE] {
    let mut quad = [0u8; QUAD_UNPADDED_SIZE];
    let start = (index as usize) * QUAD_UNPADDED_SIZE;
    if let Some(tail) = data.get(start..) {
        let len = tail.len().min(QUAD_UNPADDED_SIZE);
        quad[..len].copy_from_slice(&tail[..len]);
    }
    quad
}
