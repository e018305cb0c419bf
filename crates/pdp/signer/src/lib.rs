//! Client signing for proof set operations.
//!
//! The service contract only accepts proof set creation and root addition
//! requests that carry an EIP-712 signature from the paying client. This
//! crate defines the [`SigningIdentity`] capability the orchestration layer
//! signs through, a [`LocalIdentity`] backed by an in-memory key, and the
//! `extraData` encodings providers forward on-chain.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod auth;
mod error;
mod identity;
pub mod typed;

pub use alloy_signer_local::PrivateKeySigner;
pub use auth::AuthSignature;
pub use error::{Result, SignerError};
pub use identity::{LocalIdentity, SigningIdentity};
