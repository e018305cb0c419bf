//! Piece uploads.
//!
//! An [`UploadPipeline`] takes a blob to a confirmed root in a proof set:
//! the size is checked against [`UploadConfig`], the piece commitment is
//! computed locally, a storage target is resolved through the
//! [`ProofSetCoordinator`](tessera_proofset::ProofSetCoordinator), the bytes
//! are handed to the provider, and once the provider has parked the piece a
//! single root addition is submitted.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod config;
mod error;
mod pipeline;

pub use config::{MAX_UPLOAD_SIZE, MIN_UPLOAD_SIZE, UploadConfig};
pub use error::{Result, UploadError, UploadPhase};
pub use pipeline::{UploadPipeline, UploadResult};
