//! The tessera storage client.
//!
//! [`StorageClient`] binds a network, a provider directory and a signing
//! identity, and exposes the whole system as four calls:
//!
//! - [`upload`](StorageClient::upload) stores bytes and returns the piece
//!   commitment and root id
//! - [`download`](StorageClient::download) fetches and verifies a piece
//! - [`providers`](StorageClient::providers) lists approved providers
//! - [`proof_sets`](StorageClient::proof_sets) lists the caller's proof sets

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod client;
mod config;
mod error;

pub use client::{StorageClient, StorageClientBuilder};
pub use config::ClientConfig;
pub use error::{ClientError, Result};

pub use tessera_proofset::SelectionOptions;
pub use tessera_retrieval::FetchOptions;
pub use tessera_upload::UploadResult;
