//! Core primitive types shared across the tessera crates.
//!
//! # Types
//!
//! ## Identifiers
//! - [`ProviderId`], [`ProofSetId`], [`RootId`], [`ClientDatasetId`]
//! - [`Epoch`] - the network's discrete time unit
//! - [`TxHash`] - transaction handle returned by providers
//! - [`TxStatus`] - where a submitted transaction stands
//!
//! ## Registry records
//! - [`ProviderInfo`] - an approved storage provider
//! - [`ProofSetSummary`] - one of a client's proof sets with liveness detail
//!
//! ## Roots
//! - [`RootData`] - a piece to be added to a proof set
//! - [`RootEntry`] - a piece recorded in a proof set
//!
//! ## Errors
//! - [`ErrorKind`] and [`Classify`] - failure classification shared by every crate

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub use alloy_primitives::{Address, B256, U256};
pub use tessera_piece::PieceCommitment;

use serde::{Deserialize, Serialize};
use url::Url;

// ============================================================================
// Identifiers
// ============================================================================

/// Registry-assigned provider id. Zero means "not registered".
pub type ProviderId = u64;

/// On-chain proof set id assigned by the verifier.
pub type ProofSetId = u64;

/// Root id within a proof set.
pub type RootId = u64;

/// Client-chosen dataset id, unique per payer.
pub type ClientDatasetId = u64;

/// Network epoch.
pub type Epoch = u64;

/// Transaction hash.
pub type TxHash = B256;

/// Status of a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Not yet mined.
    Pending,
    /// Mined and successful.
    Confirmed,
    /// Mined and reverted, or dropped.
    #[serde(alias = "failed", alias = "reverted")]
    Rejected,
}

impl TxStatus {
    /// Whether the transaction reached a final state.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

// ============================================================================
// Providers
// ============================================================================

/// An approved storage provider.
///
/// Approved records are never edited. A provider changing its endpoints is
/// removed and registered again under a new id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    /// Registry id.
    pub id: ProviderId,
    /// Address the provider is paid at, and the payee of its proof sets.
    pub owner: Address,
    /// Base URL of the provider's PDP API.
    pub pdp_url: Url,
    /// Base URL pieces are downloaded from.
    pub retrieval_url: Url,
    /// Epoch the registration was submitted.
    pub registered_at: Epoch,
    /// Epoch the registration was approved.
    pub approved_at: Epoch,
}

// ============================================================================
// Proof sets
// ============================================================================

/// One of a client's proof sets, combining the service registry record with
/// the verifier's view of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofSetSummary {
    /// Proof set id on the verifier.
    pub pdp_proof_set_id: ProofSetId,
    /// Payment rail funding this proof set.
    pub rail_id: u64,
    /// Client paying for storage.
    pub payer: Address,
    /// Provider storing the data.
    pub payee: Address,
    /// Client-chosen dataset id.
    pub client_dataset_id: ClientDatasetId,
    /// Whether retrievals may be served through the CDN.
    pub with_cdn: bool,
    /// Number of roots currently in the set.
    pub root_count: u64,
    /// Id the next added root will receive.
    pub next_root_id: RootId,
    /// Whether the verifier has confirmed the set.
    pub is_live: bool,
    /// Whether the set reports to the expected service contract.
    pub is_managed: bool,
}

impl ProofSetSummary {
    /// Whether the set already holds data.
    pub fn has_roots(&self) -> bool {
        self.root_count > 0
    }

    /// Whether the set can receive new roots from this client.
    pub fn is_usable(&self) -> bool {
        self.is_live && self.is_managed
    }
}

// ============================================================================
// Roots
// ============================================================================

/// A piece to be added to a proof set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootData {
    /// The piece.
    pub piece: PieceCommitment,
    /// Payload length in bytes.
    pub raw_size: u64,
}

/// A piece recorded in a proof set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootEntry {
    /// The piece.
    pub piece: PieceCommitment,
    /// Payload length in bytes.
    pub raw_size: u64,
    /// Assigned root id.
    pub root_id: RootId,
}

// ============================================================================
// Error classification
// ============================================================================

/// Broad class of a failure, letting callers tell bad input from
/// infrastructure trouble from corrupted data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The request was invalid. Retrying it unchanged will fail again.
    Validation,
    /// A network, provider or chain failure. Retrying later may succeed.
    Transient,
    /// A bounded wait ran out.
    Timeout,
    /// Data did not match its commitment. Never retried.
    Integrity,
    /// Several independent attempts all failed.
    Aggregate,
    /// The caller cancelled the operation.
    Cancelled,
}

/// Errors that can report their [`ErrorKind`].
pub trait Classify {
    /// The class of this error.
    fn kind(&self) -> ErrorKind;
}

impl Classify for tessera_piece::PieceError {
    fn kind(&self) -> ErrorKind {
        if self.is_integrity() {
            ErrorKind::Integrity
        } else {
            ErrorKind::Validation
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_info_serde() {
        let json = r#"{
            "id": 3,
            "owner": "0x00000000000000000000000000000000000000aa",
            "pdpUrl": "https://sp.example/",
            "retrievalUrl": "https://sp.example/",
            "registeredAt": 10,
            "approvedAt": 12
        }"#;

        let info: ProviderInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.id, 3);
        assert_eq!(info.owner, Address::with_last_byte(0xaa));
        assert_eq!(info.pdp_url.as_str(), "https://sp.example/");
        assert_eq!(info.approved_at, 12);
    }

    #[test]
    fn test_proof_set_usability() {
        let mut set = ProofSetSummary {
            pdp_proof_set_id: 1,
            rail_id: 1,
            payer: Address::with_last_byte(1),
            payee: Address::with_last_byte(2),
            client_dataset_id: 0,
            with_cdn: false,
            root_count: 0,
            next_root_id: 0,
            is_live: true,
            is_managed: true,
        };
        assert!(set.is_usable());
        assert!(!set.has_roots());

        set.root_count = 2;
        set.is_managed = false;
        assert!(set.has_roots());
        assert!(!set.is_usable());
    }

    #[test]
    fn test_piece_error_classification() {
        assert_eq!(tessera_piece::compute(&[0u8; 10]).unwrap_err().kind(), ErrorKind::Validation);
        let a = tessera_piece::compute(&[1u8; 100]).unwrap();
        let err = tessera_piece::verify(&a, &[2u8; 100]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert_eq!(ErrorKind::Integrity.to_string(), "integrity");
    }
}
