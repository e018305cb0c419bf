//! Provider directory.
//!
//! Read-only queries over the service registry and the proof verifier:
//! approved providers, provider lookup by address or id, and a client's
//! proof sets enriched with liveness and root counts.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod directory;
mod error;
mod memory;
mod traits;

pub use directory::ProviderDirectory;
pub use error::{DirectoryError, Result};
pub use memory::{InMemoryLedger, LedgerProofSet, LedgerSnapshot, LedgerTransaction};
pub use traits::{ProofSetRecord, ServiceRegistry, VerifierLedger};

#[cfg(test)]
mod tests;
