//! The provider capability.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tessera_piece::PieceCommitment;
use tessera_primitives::{Address, ProofSetId, ProviderInfo, TxHash};

use crate::{
    AddRootsRequest, ByteStream, CreateProofSetRequest, CreationStatus, ProofSetDetails, Result,
    RootAdditionStatus, RootSubmission, UploadSession,
};

/// A storage provider's PDP API.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait PdpProvider: Send + Sync {
    /// Address the provider is registered under.
    fn owner(&self) -> Address;

    /// Connectivity probe.
    async fn ping(&self) -> Result<()>;

    /// Whether the piece is parked (durably stored) at the provider.
    async fn find_piece(&self, piece: &PieceCommitment, size: u64) -> Result<bool>;

    /// First half of an upload: announce the piece, possibly learning the
    /// provider already holds it.
    async fn check_piece(&self, piece: &PieceCommitment, size: u64) -> Result<UploadSession>;

    /// Second half of an upload: transfer the bytes to an open session.
    async fn put_piece(&self, session: &UploadSession, data: Bytes) -> Result<()>;

    /// Stream a piece's bytes.
    async fn download_piece(&self, piece: &PieceCommitment) -> Result<ByteStream>;

    /// Submit a proof set creation, returning the creation transaction.
    async fn create_proof_set(&self, request: &CreateProofSetRequest) -> Result<TxHash>;

    /// Progress of a proof set creation.
    async fn creation_status(&self, tx: TxHash) -> Result<CreationStatus>;

    /// Proof set details.
    async fn proof_set(&self, id: ProofSetId) -> Result<ProofSetDetails>;

    /// Submit a root addition.
    async fn add_roots(&self, id: ProofSetId, request: &AddRootsRequest) -> Result<RootSubmission>;

    /// Progress of a root addition.
    async fn root_addition_status(&self, id: ProofSetId, tx: TxHash) -> Result<RootAdditionStatus>;
}

/// Turns registry records into provider handles.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait ProviderConnector: Send + Sync {
    /// A handle for `info`.
    fn connect(&self, info: &ProviderInfo) -> Arc<dyn PdpProvider>;
}
