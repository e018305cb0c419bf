//! Ledger and registry query capabilities.
//!
//! The directory never talks to a chain directly. Deployments supply
//! implementations of [`ServiceRegistry`] (business-logic registry on the
//! service contract) and [`VerifierLedger`] (low-level proof verifier), for
//! example backed by RPC calls or an indexer. [`InMemoryLedger`] implements
//! both for tests and offline use.
//!
//! [`InMemoryLedger`]: crate::InMemoryLedger

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessera_primitives::{
    Address, ClientDatasetId, ProofSetId, ProviderId, ProviderInfo, RootId, TxHash, TxStatus,
};

use crate::Result;

/// A proof set as recorded by the service registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofSetRecord {
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
    /// Whether the CDN may serve this set.
    pub with_cdn: bool,
}

/// Queries against the service contract's provider and proof set registry.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait ServiceRegistry: Send + Sync {
    /// Address of the service contract. Proof sets whose listener is this
    /// address are managed by it.
    fn service_address(&self) -> Address;

    /// Ids of all approved providers.
    async fn approved_provider_ids(&self) -> Result<Vec<ProviderId>>;

    /// An approved provider's record.
    async fn provider(&self, id: ProviderId) -> Result<Option<ProviderInfo>>;

    /// Id of the provider registered at `address`, or `0` if none.
    async fn provider_id_by_address(&self, address: Address) -> Result<ProviderId>;

    /// All proof sets paid for by `client`.
    async fn client_proof_sets(&self, client: Address) -> Result<Vec<ProofSetRecord>>;

    /// Dataset id the client's next proof set should use.
    async fn next_client_dataset_id(&self, client: Address) -> Result<ClientDatasetId>;
}

/// Queries against the proof verifier and the chain it runs on.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait VerifierLedger: Send + Sync {
    /// Whether the proof set exists and is being proven.
    async fn proof_set_live(&self, id: ProofSetId) -> Result<bool>;

    /// Id the next added root will receive.
    async fn next_root_id(&self, id: ProofSetId) -> Result<RootId>;

    /// Number of roots in the set.
    async fn root_count(&self, id: ProofSetId) -> Result<u64>;

    /// Contract notified of the set's events.
    async fn proof_set_listener(&self, id: ProofSetId) -> Result<Address>;

    /// Status of a submitted transaction, or `None` if the chain has not
    /// seen it yet.
    async fn transaction_status(&self, tx: TxHash) -> Result<Option<TxStatus>>;
}
