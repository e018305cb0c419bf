//! Proof set coordination.
//!
//! The [`ProofSetCoordinator`] takes an upload from "somewhere to store this"
//! to confirmed roots:
//!
//! 1. resolve a provider and proof set ([`SelectionOptions`])
//! 2. create and wait for a new proof set when nothing suitable exists
//! 3. sign and submit roots, then wait for their ids
//!
//! Progress is tracked per upload by an [`UploadTask`] whose states and
//! transitions are defined in [`state`]. Every wait is bounded by a
//! [`PollConfig`] and fails with its own timeout error.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod config;
mod coordinator;
mod error;
mod observer;
mod poll;
mod selection;
pub mod state;

pub use config::{CoordinatorConfig, PollConfig};
pub use coordinator::ProofSetCoordinator;
pub use error::{ProofSetError, Result};
pub use observer::{NoopObserver, UploadObserver};
pub use poll::poll_until;
pub use selection::{Resolution, SelectionOptions, StorageTarget, rank_proof_sets};
pub use state::{CoordinatorEvent, CoordinatorState, InvalidTransition, UploadTask, transition};

#[cfg(test)]
mod tests;
