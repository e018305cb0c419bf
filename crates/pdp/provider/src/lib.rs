//! Storage provider PDP API.
//!
//! [`PdpProvider`] is the capability the orchestration layer drives: piece
//! lookup, two-phase upload, download, proof set creation, root addition and
//! the status endpoints for each asynchronous step. [`HttpProvider`] speaks
//! the provider's HTTP API; [`HttpConnector`] hands out providers sharing a
//! single connection pool.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
mod http;
mod traits;
mod types;

pub use error::{ProviderError, Result};
pub use http::{HttpConnector, HttpProvider, piece_check};
pub use traits::{PdpProvider, ProviderConnector};
pub use types::{
    AddRootEntry, AddRootsRequest, ByteStream, CreateProofSetRequest, CreationStatus, PieceCheck,
    ProofSetDetails, RootAdditionStatus, RootDetails, RootSubmission, Subroot, UploadSession,
};

#[cfg(test)]
mod tests;
