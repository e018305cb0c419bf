//! In-memory registry and ledger.
//!
//! Backs the directory for tests and offline use. State can be loaded from
//! and saved to a TOML snapshot.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc};
use tessera_primitives::{
    Address, ClientDatasetId, ProofSetId, ProviderId, ProviderInfo, RootData, RootEntry, RootId,
    TxHash, TxStatus,
};

use crate::{DirectoryError, ProofSetRecord, Result, ServiceRegistry, VerifierLedger};

/// A proof set as held by the in-memory ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerProofSet {
    /// Registry view.
    #[serde(flatten)]
    pub record: ProofSetRecord,
    /// Whether the verifier has confirmed the set.
    #[serde(default)]
    pub is_live: bool,
    /// Contract notified of the set's events.
    pub listener: Address,
    /// Id the next added root will receive.
    #[serde(default)]
    pub next_root_id: RootId,
    /// Roots currently in the set.
    #[serde(default)]
    pub roots: Vec<RootEntry>,
}

/// A transaction known to the in-memory ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Transaction hash.
    pub hash: TxHash,
    /// Current status.
    pub status: TxStatus,
}

/// Serializable state of an [`InMemoryLedger`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Service contract address.
    pub service: Address,
    /// Approved providers.
    #[serde(default)]
    pub providers: Vec<ProviderInfo>,
    /// Proof sets.
    #[serde(default)]
    pub proof_sets: Vec<LedgerProofSet>,
    /// Transactions.
    #[serde(default)]
    pub transactions: Vec<LedgerTransaction>,
}

#[derive(Debug, Default)]
struct State {
    snapshot: LedgerSnapshot,
    unavailable: bool,
}

/// In-memory [`ServiceRegistry`] and [`VerifierLedger`].
///
/// Clones share state. Every registered provider counts as approved.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<State>>,
}

impl InMemoryLedger {
    /// Create an empty ledger for the given service contract.
    pub fn new(service: Address) -> Self {
        Self::from_snapshot(LedgerSnapshot {
            service,
            ..Default::default()
        })
    }

    /// Create a ledger holding `snapshot`.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: Arc::new(RwLock::new(State {
                snapshot,
                unavailable: false,
            })),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().snapshot.clone()
    }

    /// Parse a TOML snapshot.
    pub fn from_toml(s: &str) -> Result<Self> {
        let snapshot = toml::from_str(s).map_err(|e| DirectoryError::Snapshot(e.to_string()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Render the current state as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&self.snapshot()).map_err(|e| DirectoryError::Snapshot(e.to_string()))
    }

    /// Load a TOML snapshot from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| DirectoryError::Snapshot(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Write the current state to disk as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?).map_err(|e| DirectoryError::Snapshot(e.to_string()))
    }

    /// Make every query fail with [`DirectoryError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unavailable = unavailable;
    }

    /// Register (and approve) a provider, replacing any record with its id.
    pub fn add_provider(&self, info: ProviderInfo) {
        let mut state = self.state.write();
        state.snapshot.providers.retain(|p| p.id != info.id);
        state.snapshot.providers.push(info);
    }

    /// Remove a provider.
    pub fn remove_provider(&self, id: ProviderId) {
        self.state.write().snapshot.providers.retain(|p| p.id != id);
    }

    /// Insert a fully specified proof set.
    pub fn insert_proof_set(&self, set: LedgerProofSet) {
        let mut state = self.state.write();
        let id = set.record.pdp_proof_set_id;
        state.snapshot.proof_sets.retain(|s| s.record.pdp_proof_set_id != id);
        state.snapshot.proof_sets.push(set);
    }

    /// Record a new, not yet live, proof set managed by the service contract.
    pub fn create_proof_set(
        &self,
        payer: Address,
        payee: Address,
        client_dataset_id: ClientDatasetId,
        with_cdn: bool,
    ) -> ProofSetRecord {
        let mut state = self.state.write();
        let snapshot = &mut state.snapshot;

        let id = snapshot
            .proof_sets
            .iter()
            .map(|s| s.record.pdp_proof_set_id)
            .max()
            .map_or(1, |max| max + 1);
        let record = ProofSetRecord {
            pdp_proof_set_id: id,
            rail_id: id,
            payer,
            payee,
            client_dataset_id,
            with_cdn,
        };

        snapshot.proof_sets.push(LedgerProofSet {
            record: record.clone(),
            is_live: false,
            listener: snapshot.service,
            next_root_id: 0,
            roots: Vec::new(),
        });
        record
    }

    /// Flip a proof set live.
    pub fn mark_live(&self, id: ProofSetId) {
        self.update_set(id, |set| set.is_live = true);
    }

    /// Append roots to a proof set, returning their assigned ids.
    pub fn add_roots(&self, id: ProofSetId, roots: &[RootData]) -> Vec<RootId> {
        self.update_set(id, |set| {
            roots
                .iter()
                .map(|root| {
                    let root_id = set.next_root_id;
                    set.next_root_id += 1;
                    set.roots.push(RootEntry {
                        piece: root.piece,
                        raw_size: root.raw_size,
                        root_id,
                    });
                    root_id
                })
                .collect()
        })
        .unwrap_or_default()
    }

    /// Change the contract listening to a proof set.
    pub fn set_listener(&self, id: ProofSetId, listener: Address) {
        self.update_set(id, |set| set.listener = listener);
    }

    /// Set the status of a transaction.
    pub fn set_transaction(&self, hash: TxHash, status: TxStatus) {
        let mut state = self.state.write();
        state.snapshot.transactions.retain(|t| t.hash != hash);
        state
            .snapshot
            .transactions
            .push(LedgerTransaction { hash, status });
    }

    /// A proof set's current state.
    pub fn proof_set(&self, id: ProofSetId) -> Option<LedgerProofSet> {
        self.state
            .read()
            .snapshot
            .proof_sets
            .iter()
            .find(|s| s.record.pdp_proof_set_id == id)
            .cloned()
    }

    fn update_set<T>(&self, id: ProofSetId, f: impl FnOnce(&mut LedgerProofSet) -> T) -> Option<T> {
        self.state
            .write()
            .snapshot
            .proof_sets
            .iter_mut()
            .find(|s| s.record.pdp_proof_set_id == id)
            .map(f)
    }

    fn read<T>(&self, operation: &'static str, f: impl FnOnce(&LedgerSnapshot) -> T) -> Result<T> {
        let state = self.state.read();
        if state.unavailable {
            return Err(DirectoryError::unavailable(operation, "ledger offline"));
        }
        Ok(f(&state.snapshot))
    }

    fn read_set<T>(
        &self,
        operation: &'static str,
        id: ProofSetId,
        f: impl FnOnce(Option<&LedgerProofSet>) -> T,
    ) -> Result<T> {
        self.read(operation, |snapshot| {
            f(snapshot.proof_sets.iter().find(|s| s.record.pdp_proof_set_id == id))
        })
    }
}

#[async_trait]
impl ServiceRegistry for InMemoryLedger {
    fn service_address(&self) -> Address {
        self.state.read().snapshot.service
    }

    async fn approved_provider_ids(&self) -> Result<Vec<ProviderId>> {
        self.read("approved_provider_ids", |s| {
            s.providers.iter().map(|p| p.id).collect()
        })
    }

    async fn provider(&self, id: ProviderId) -> Result<Option<ProviderInfo>> {
        self.read("provider", |s| s.providers.iter().find(|p| p.id == id).cloned())
    }

    async fn provider_id_by_address(&self, address: Address) -> Result<ProviderId> {
        self.read("provider_id_by_address", |s| {
            s.providers
                .iter()
                .find(|p| p.owner == address)
                .map_or(0, |p| p.id)
        })
    }

    async fn client_proof_sets(&self, client: Address) -> Result<Vec<ProofSetRecord>> {
        self.read("client_proof_sets", |s| {
            s.proof_sets
                .iter()
                .filter(|set| set.record.payer == client)
                .map(|set| set.record.clone())
                .collect()
        })
    }

    async fn next_client_dataset_id(&self, client: Address) -> Result<ClientDatasetId> {
        self.read("next_client_dataset_id", |s| {
            s.proof_sets
                .iter()
                .filter(|set| set.record.payer == client)
                .map(|set| set.record.client_dataset_id + 1)
                .max()
                .unwrap_or(0)
        })
    }
}

#[async_trait]
impl VerifierLedger for InMemoryLedger {
    async fn proof_set_live(&self, id: ProofSetId) -> Result<bool> {
        self.read_set("proof_set_live", id, |set| set.is_some_and(|s| s.is_live))
    }

    async fn next_root_id(&self, id: ProofSetId) -> Result<RootId> {
        self.read_set("next_root_id", id, |set| set.map_or(0, |s| s.next_root_id))
    }

    async fn root_count(&self, id: ProofSetId) -> Result<u64> {
        self.read_set("root_count", id, |set| set.map_or(0, |s| s.roots.len() as u64))
    }

    async fn proof_set_listener(&self, id: ProofSetId) -> Result<Address> {
        self.read_set("proof_set_listener", id, |set| {
            set.map_or(Address::ZERO, |s| s.listener)
        })
    }

    async fn transaction_status(&self, tx: TxHash) -> Result<Option<TxStatus>> {
        self.read("transaction_status", |s| {
            s.transactions
                .iter()
                .find(|t| t.hash == tx)
                .map(|t| t.status)
        })
    }
}
