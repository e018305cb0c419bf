//! Upload progress hooks.

use tessera_piece::PieceCommitment;
use tessera_primitives::{ProviderInfo, RootId, TxHash};
use tessera_provider::{CreationStatus, RootSubmission};

use crate::StorageTarget;

/// Receives progress notifications during an upload.
///
/// Every hook defaults to doing nothing. Hooks run inline on the upload's
/// task and should return quickly.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait UploadObserver: Send + Sync {
    /// A provider was chosen.
    fn provider_selected(&self, _provider: &ProviderInfo) {}

    /// The target proof set is known, either existing or newly created.
    fn proof_set_resolved(&self, _target: &StorageTarget) {}

    /// A proof set creation was submitted.
    fn creation_started(&self, _tx_hash: TxHash) {}

    /// The provider reported creation progress.
    fn creation_progress(&self, _status: &CreationStatus) {}

    /// The provider stored the piece.
    fn upload_complete(&self, _piece: &PieceCommitment) {}

    /// Roots were submitted.
    fn roots_added(&self, _submission: &RootSubmission) {}

    /// Roots were confirmed with their assigned ids.
    fn roots_confirmed(&self, _root_ids: &[RootId]) {}
}

/// An observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl UploadObserver for NoopObserver {}
