//! Upload configuration.

use serde::{Deserialize, Serialize};
use tessera_piece::constants::MIN_PAYLOAD_SIZE;
use tessera_proofset::PollConfig;

/// Smallest accepted upload.
pub const MIN_UPLOAD_SIZE: u64 = MIN_PAYLOAD_SIZE;

/// Largest accepted upload (200 MiB).
pub const MAX_UPLOAD_SIZE: u64 = 200 * 1024 * 1024;

/// Upload limits and the parking wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Smallest accepted payload in bytes.
    pub min_size: u64,
    /// Largest accepted payload in bytes.
    pub max_size: u64,
    /// Waiting for the provider to park an uploaded piece.
    pub parking: PollConfig,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            min_size: MIN_UPLOAD_SIZE,
            max_size: MAX_UPLOAD_SIZE,
            parking: PollConfig::parking(),
        }
    }
}

impl UploadConfig {
    /// Whether `size` is within the accepted range.
    pub fn accepts(&self, size: u64) -> bool {
        (self.min_size..=self.max_size).contains(&size)
    }
}
