//! Request and response types of the provider PDP API.

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tessera_primitives::{Address, ProofSetId, RootData, RootId, TxHash, TxStatus};
use url::Url;

use crate::Result;

/// Streamed piece bytes.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Outcome of the "check" half of a piece upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadSession {
    /// The provider already holds this exact piece; no transfer is needed.
    AlreadyHeld,
    /// An upload session was opened at `upload_url`.
    Open {
        /// Where to send the bytes.
        upload_url: Url,
    },
}

/// Piece identification as providers expect it in lookups and checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceCheck {
    /// Hash function name.
    pub name: String,
    /// Hex-encoded legacy digest, without prefix.
    pub hash: String,
    /// Payload size in bytes.
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckRequest<'a> {
    pub(crate) check: &'a PieceCheck,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FoundPiece {
    pub(crate) piece_cid: String,
}

/// Body of a proof set creation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProofSetRequest {
    /// Service contract recording the set.
    pub record_keeper: Address,
    /// Hex ABI payload carrying the client's signature.
    pub extra_data: String,
}

/// Provider-reported progress of a proof set creation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationStatus {
    /// Creation transaction.
    pub create_message_hash: TxHash,
    /// Whether the provider has seen the set created on-chain.
    #[serde(rename = "proofsetCreated", alias = "proofSetCreated")]
    pub proof_set_created: bool,
    /// Service label the provider filed the set under.
    #[serde(default)]
    pub service: String,
    /// Transaction status.
    pub tx_status: TxStatus,
    /// Whether the transaction succeeded, once known.
    #[serde(default)]
    pub ok: Option<bool>,
    /// Assigned proof set id, once created.
    #[serde(default)]
    pub proof_set_id: Option<ProofSetId>,
}

impl CreationStatus {
    /// The transaction mined but failed.
    pub fn is_failed(&self) -> bool {
        self.ok == Some(false) || self.tx_status == TxStatus::Rejected
    }
}

/// One root as listed in proof set details.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootDetails {
    /// Root id.
    pub root_id: RootId,
    /// Root piece CID.
    pub root_cid: String,
}

/// A proof set as the provider sees it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofSetDetails {
    /// Proof set id.
    pub id: ProofSetId,
    /// Roots in the set.
    #[serde(default)]
    pub roots: Vec<RootDetails>,
    /// Next epoch the set will be challenged at.
    #[serde(default)]
    pub next_challenge_epoch: Option<u64>,
}

/// Sub-piece of a root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subroot {
    /// Sub-piece CID.
    pub subroot_cid: String,
}

/// One root in a root addition request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRootEntry {
    /// Root piece CID.
    pub root_cid: String,
    /// Sub-pieces composing the root.
    pub subroots: Vec<Subroot>,
}

/// Body of a root addition request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRootsRequest {
    /// Roots to add.
    pub roots: Vec<AddRootEntry>,
    /// Hex ABI payload carrying the client's signature.
    pub extra_data: String,
}

impl AddRootsRequest {
    /// A request adding each piece as a root made of itself.
    pub fn new(roots: &[RootData], extra_data: String) -> Self {
        Self {
            roots: roots
                .iter()
                .map(|root| {
                    let cid = root.piece.to_legacy_string();
                    AddRootEntry {
                        root_cid: cid.clone(),
                        subroots: vec![Subroot { subroot_cid: cid }],
                    }
                })
                .collect(),
            extra_data,
        }
    }
}

/// How a provider acknowledged a root addition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootSubmission {
    /// Older providers return no transaction handle; the addition is
    /// complete once acknowledged.
    Legacy,
    /// The addition transaction was submitted and must be confirmed.
    Submitted {
        /// Root addition transaction.
        tx_hash: TxHash,
    },
}

/// Provider-reported progress of a root addition.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootAdditionStatus {
    /// Root addition transaction.
    pub tx_hash: TxHash,
    /// Transaction status.
    pub tx_status: TxStatus,
    /// Proof set the roots were added to.
    pub proof_set_id: ProofSetId,
    /// Number of roots in the request.
    pub root_count: u64,
    /// Whether the add message succeeded, once known.
    #[serde(default)]
    pub add_message_ok: Option<bool>,
    /// Root ids assigned on-chain, once confirmed.
    #[serde(default)]
    pub confirmed_root_ids: Option<Vec<RootId>>,
}

impl RootAdditionStatus {
    /// The transaction mined but failed.
    pub fn is_failed(&self) -> bool {
        self.add_message_ok == Some(false) || self.tx_status == TxStatus::Rejected
    }
}
