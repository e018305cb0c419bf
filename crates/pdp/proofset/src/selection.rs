//! Provider and proof set selection.

use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tessera_primitives::{
    Address, ClientDatasetId, ProofSetId, ProofSetSummary, ProviderId, ProviderInfo,
};
use tessera_provider::PdpProvider;

/// What the caller pinned down about where an upload goes.
///
/// Resolution order: an explicit proof set wins, then an explicit provider,
/// then automatic selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectionOptions {
    /// Use this registry provider.
    pub provider_id: Option<ProviderId>,
    /// Use the provider registered at this address.
    pub provider_address: Option<Address>,
    /// Use this proof set. Must belong to the caller and to the provider
    /// named above, if any.
    pub proof_set_id: Option<ProofSetId>,
    /// Whether the data should be served through the CDN.
    pub with_cdn: bool,
}

impl SelectionOptions {
    /// Whether a provider was named explicitly.
    pub fn names_provider(&self) -> bool {
        self.provider_id.is_some() || self.provider_address.is_some()
    }
}

/// Outcome of resolution, before any proof set is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Reuse a live proof set.
    Existing {
        /// Provider storing the set.
        provider: ProviderInfo,
        /// The set.
        proof_set: ProofSetSummary,
    },
    /// Create a new proof set with `provider`.
    Create {
        /// The chosen provider.
        provider: ProviderInfo,
    },
}

impl Resolution {
    /// The chosen provider.
    pub fn provider(&self) -> &ProviderInfo {
        match self {
            Self::Existing { provider, .. } | Self::Create { provider } => provider,
        }
    }
}

/// A live proof set ready to receive roots, with a handle on its provider.
#[derive(Clone)]
pub struct StorageTarget {
    /// Provider storing the set.
    pub provider: ProviderInfo,
    /// Connected provider API.
    pub handle: Arc<dyn PdpProvider>,
    /// The proof set.
    pub proof_set_id: ProofSetId,
    /// Dataset id the client signed the set under.
    pub client_dataset_id: ClientDatasetId,
    /// Whether the set is CDN-enabled.
    pub with_cdn: bool,
    /// Whether the set was created for this upload.
    pub created: bool,
}

impl fmt::Debug for StorageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageTarget")
            .field("provider", &self.provider.owner)
            .field("proof_set_id", &self.proof_set_id)
            .field("client_dataset_id", &self.client_dataset_id)
            .field("with_cdn", &self.with_cdn)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

/// The caller's proof sets that can take new roots, best first.
///
/// Candidates must be live, managed by the expected service and match
/// `with_cdn`; `payee` restricts them to one provider. Sets already holding
/// roots come first, then lower ids.
pub fn rank_proof_sets(
    sets: &[ProofSetSummary],
    with_cdn: bool,
    payee: Option<Address>,
) -> Vec<&ProofSetSummary> {
    let mut candidates: Vec<_> = sets
        .iter()
        .filter(|set| set.is_usable() && set.with_cdn == with_cdn)
        .filter(|set| payee.is_none_or(|payee| set.payee == payee))
        .collect();
    candidates.sort_by_key(|set| (!set.has_roots(), set.pdp_proof_set_id));
    candidates
}
