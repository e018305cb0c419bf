//! Provider and proof set lookups.

use futures::future::try_join_all;
use std::sync::Arc;
use tessera_primitives::{
    Address, ClientDatasetId, ProofSetId, ProofSetSummary, ProviderId, ProviderInfo, RootId,
    TxHash, TxStatus,
};
use tracing::{debug, trace};

use crate::{ProofSetRecord, Result, ServiceRegistry, VerifierLedger};

/// Read-only view over the service registry and the verifier ledger.
///
/// Every method is idempotent and safe to call concurrently. Nothing is
/// cached; callers that need a consistent view for the duration of one
/// operation hold on to the results themselves.
#[derive(Clone)]
pub struct ProviderDirectory {
    registry: Arc<dyn ServiceRegistry>,
    ledger: Arc<dyn VerifierLedger>,
}

impl std::fmt::Debug for ProviderDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDirectory")
            .field("service", &self.registry.service_address())
            .finish_non_exhaustive()
    }
}

impl ProviderDirectory {
    /// Create a directory over the given registry and ledger.
    pub fn new(
        registry: impl ServiceRegistry + 'static,
        ledger: impl VerifierLedger + 'static,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            ledger: Arc::new(ledger),
        }
    }

    /// Address of the service contract managing proof sets.
    pub fn service_address(&self) -> Address {
        self.registry.service_address()
    }

    /// All approved providers.
    pub async fn list_approved(&self) -> Result<Vec<ProviderInfo>> {
        let ids = self.registry.approved_provider_ids().await?;
        let providers = try_join_all(ids.iter().map(|id| self.registry.provider(*id))).await?;

        let providers: Vec<_> = providers.into_iter().flatten().collect();
        debug!(count = providers.len(), "Listed approved providers");
        Ok(providers)
    }

    /// The approved provider registered at `address`, if any.
    pub async fn resolve_by_address(&self, address: Address) -> Result<Option<ProviderInfo>> {
        let id = self.registry.provider_id_by_address(address).await?;
        if id == 0 {
            trace!(%address, "No provider registered at address");
            return Ok(None);
        }
        self.registry.provider(id).await
    }

    /// The approved provider with registry id `id`, if any.
    pub async fn resolve_by_id(&self, id: ProviderId) -> Result<Option<ProviderInfo>> {
        if id == 0 {
            return Ok(None);
        }
        self.registry.provider(id).await
    }

    /// The client's proof sets, each enriched with liveness, management and
    /// root detail from the verifier.
    pub async fn proof_sets_for_client(&self, client: Address) -> Result<Vec<ProofSetSummary>> {
        let records = self.registry.client_proof_sets(client).await?;
        let service = self.service_address();

        let summaries =
            try_join_all(records.into_iter().map(|record| self.summarise(record, service))).await?;

        debug!(
            %client,
            total = summaries.len(),
            live = summaries.iter().filter(|s| s.is_live).count(),
            "Fetched client proof sets"
        );
        Ok(summaries)
    }

    async fn summarise(&self, record: ProofSetRecord, service: Address) -> Result<ProofSetSummary> {
        let id = record.pdp_proof_set_id;
        let is_live = self.ledger.proof_set_live(id).await?;

        let (is_managed, next_root_id, root_count) = if is_live {
            let (listener, next_root_id, root_count) = futures::try_join!(
                self.ledger.proof_set_listener(id),
                self.ledger.next_root_id(id),
                self.ledger.root_count(id),
            )?;
            (listener == service, next_root_id, root_count)
        } else {
            (false, 0, 0)
        };

        Ok(ProofSetSummary {
            pdp_proof_set_id: id,
            rail_id: record.rail_id,
            payer: record.payer,
            payee: record.payee,
            client_dataset_id: record.client_dataset_id,
            with_cdn: record.with_cdn,
            root_count,
            next_root_id,
            is_live,
            is_managed,
        })
    }

    /// Whether a proof set is live.
    pub async fn proof_set_live(&self, id: ProofSetId) -> Result<bool> {
        self.ledger.proof_set_live(id).await
    }

    /// Id the next root added to `id` will receive.
    pub async fn next_root_id(&self, id: ProofSetId) -> Result<RootId> {
        self.ledger.next_root_id(id).await
    }

    /// Dataset id for the client's next proof set.
    pub async fn next_client_dataset_id(&self, client: Address) -> Result<ClientDatasetId> {
        self.registry.next_client_dataset_id(client).await
    }

    /// Status of a submitted transaction.
    pub async fn transaction_status(&self, tx: TxHash) -> Result<Option<TxStatus>> {
        self.ledger.transaction_status(tx).await
    }
}
