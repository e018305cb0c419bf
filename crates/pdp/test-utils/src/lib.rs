//! Test support for the tessera crates.
//!
//! - [`MockProvider`] - a scripted [`PdpProvider`] backed by an
//!   [`InMemoryLedger`], with per-call delays, failures and counters
//! - [`MockConnector`] - hands out registered mock providers
//! - [`MockNetwork`] - a ledger, a connector and a set of approved mock
//!   providers wired together
//!
//! [`PdpProvider`]: tessera_provider::PdpProvider
//! [`InMemoryLedger`]: tessera_directory::InMemoryLedger

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod connector;
mod fixtures;
mod provider;

pub use connector::MockConnector;
pub use fixtures::{
    MockNetwork, SERVICE, VERIFIER, live_proof_set, payload, provider_info, test_identity,
    test_spec,
};
pub use provider::{MockProvider, ops};
