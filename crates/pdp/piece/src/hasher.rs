//! Incremental piece commitment calculation.

use alloy_primitives::B256;
use std::io;

use crate::{
    PieceCommitment, PieceSize,
    constants::*,
    error::{PieceError, Result},
    tree::{Node, hash_pair, quad_root, zero_comm},
};

/// Streaming piece hasher.
///
/// Bytes are buffered one quad at a time. Completed quad roots are merged
/// into a stack of pending left siblings, one slot per tree level, so memory
/// stays proportional to the tree height rather than the payload.
///
/// ```
/// use tessera_piece::{PieceHasher, compute};
///
/// let data = vec![7u8; 4096];
/// let mut hasher = PieceHasher::new();
/// for chunk in data.chunks(1000) {
///     hasher.update(chunk);
/// }
/// assert_eq!(hasher.finalize().unwrap(), compute(&data).unwrap());
/// ```
#[derive(Clone)]
pub struct PieceHasher {
    buffer: [u8; QUAD_UNPADDED_SIZE],
    buffered: usize,
    written: u64,
    /// `pending[i]` holds a left sibling at level `QUAD_LEVEL + i`.
    pending: Vec<Option<Node>>,
}

impl Default for PieceHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceHasher {
    /// Create an empty hasher.
    pub fn new() -> Self {
        Self {
            buffer: [0u8; QUAD_UNPADDED_SIZE],
            buffered: 0,
            written: 0,
            pending: Vec::new(),
        }
    }

    /// Total bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Feed more payload bytes.
    pub fn update(&mut self, mut data: &[u8]) {
        self.written += data.len() as u64;

        while !data.is_empty() {
            let take = (QUAD_UNPADDED_SIZE - self.buffered).min(data.len());
            let (head, tail) = data.split_at(take);
            self.buffer[self.buffered..self.buffered + take].copy_from_slice(head);
            self.buffered += take;
            data = tail;

            if self.buffered == QUAD_UNPADDED_SIZE {
                let node = quad_root(&self.buffer);
                self.push(node);
                self.buffered = 0;
            }
        }
    }

    /// Finish the computation.
    ///
    /// Fails with [`PieceError::Empty`] if nothing was written and with
    /// [`PieceError::PayloadTooSmall`] below the structural minimum.
    pub fn finalize(mut self) -> Result<PieceCommitment> {
        if self.written == 0 {
            return Err(PieceError::Empty);
        }
        let size = PieceSize::for_payload(self.written)?;

        if self.buffered > 0 {
            self.buffer[self.buffered..].fill(0);
            let node = quad_root(&self.buffer);
            self.push(node);
        }

        let levels = (size.height() - QUAD_LEVEL) as usize;
        let mut carry: Option<Node> = None;
        for i in 0..levels {
            let zero = zero_comm(QUAD_LEVEL + i as u8);
            let left = self.pending.get_mut(i).and_then(Option::take);
            carry = match (left, carry) {
                (Some(left), Some(right)) => Some(hash_pair(&left, &right)),
                (Some(left), None) => Some(hash_pair(&left, &zero)),
                (None, Some(left)) => Some(hash_pair(&left, &zero)),
                (None, None) => None,
            };
        }

        let root = carry
            .or_else(|| self.pending.get(levels).copied().flatten())
            .ok_or(PieceError::Empty)?;

        PieceCommitment::new(B256::from(root), size)
    }

    /// Merge a completed quad root into the pending stack.
    fn push(&mut self, mut node: Node) {
        for slot in self.pending.iter_mut() {
            match slot.take() {
                Some(left) => node = hash_pair(&left, &node),
                None => {
                    *slot = Some(node);
                    return;
                }
            }
        }
        self.pending.push(Some(node));
    }
}

impl io::Write for PieceHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
