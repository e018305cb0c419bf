//! A scripted provider.

use alloy_primitives::{B256, Bytes as AbiBytes, hex, keccak256};
use alloy_sol_types::SolValue;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tessera_directory::InMemoryLedger;
use tessera_piece::PieceCommitment;
use tessera_primitives::{Address, ProofSetId, ProviderInfo, RootData, TxHash, TxStatus};
use tessera_provider::{
    AddRootsRequest, ByteStream, CreateProofSetRequest, CreationStatus, PdpProvider,
    ProofSetDetails, ProviderError, Result, RootAdditionStatus, RootDetails, RootSubmission,
    UploadSession,
};
use url::Url;

/// Operation names used for delays, failures and counters.
pub mod ops {
    /// [`PdpProvider::ping`](tessera_provider::PdpProvider::ping)
    pub const PING: &str = "ping";
    /// [`PdpProvider::find_piece`](tessera_provider::PdpProvider::find_piece)
    pub const FIND_PIECE: &str = "find_piece";
    /// [`PdpProvider::check_piece`](tessera_provider::PdpProvider::check_piece)
    pub const CHECK_PIECE: &str = "check_piece";
    /// [`PdpProvider::put_piece`](tessera_provider::PdpProvider::put_piece)
    pub const PUT_PIECE: &str = "put_piece";
    /// [`PdpProvider::download_piece`](tessera_provider::PdpProvider::download_piece)
    pub const DOWNLOAD_PIECE: &str = "download_piece";
    /// [`PdpProvider::create_proof_set`](tessera_provider::PdpProvider::create_proof_set)
    pub const CREATE_PROOF_SET: &str = "create_proof_set";
    /// [`PdpProvider::creation_status`](tessera_provider::PdpProvider::creation_status)
    pub const CREATION_STATUS: &str = "creation_status";
    /// [`PdpProvider::proof_set`](tessera_provider::PdpProvider::proof_set)
    pub const PROOF_SET: &str = "proof_set";
    /// [`PdpProvider::add_roots`](tessera_provider::PdpProvider::add_roots)
    pub const ADD_ROOTS: &str = "add_roots";
    /// [`PdpProvider::root_addition_status`](tessera_provider::PdpProvider::root_addition_status)
    pub const ROOT_ADDITION_STATUS: &str = "root_addition_status";
}

/// How a scripted transaction plays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TxScript {
    /// Confirmed on submission.
    #[default]
    Confirm,
    /// Never mined.
    Stall,
    /// Mined and reverted.
    Reject,
}

#[derive(Debug, Default)]
struct State {
    /// Stored payloads by legacy digest.
    pieces: HashMap<B256, Bytes>,
    /// Bytes served instead of the stored payload.
    served: HashMap<B256, Bytes>,
    /// Open upload sessions.
    sessions: HashMap<Url, PieceCommitment>,
    /// Remaining `find_piece` calls answering "not parked" per piece.
    parking: HashMap<B256, usize>,
    parking_polls: usize,

    creations: HashMap<TxHash, ProofSetId>,
    creation_script: TxScript,
    additions: HashMap<TxHash, (ProofSetId, Vec<u64>)>,
    addition_script: TxScript,
    legacy_roots: bool,
    /// Proof sets stay not live after creation.
    hold_liveness: bool,
    /// Downloads fail after their first chunk.
    break_downloads: bool,
    /// Transactions are reported by the provider but never reach the ledger.
    hide_transactions: bool,

    delays: HashMap<&'static str, Duration>,
    failures: HashMap<&'static str, u16>,
    calls: HashMap<&'static str, usize>,
    cancelled: HashMap<&'static str, usize>,
    next_tx: u64,
}

/// A [`PdpProvider`] whose behaviour is scripted by the test.
///
/// Proof set creation and root addition are recorded in the shared
/// [`InMemoryLedger`], so the directory observes them as a real chain would.
/// Calls dropped before completing, for example when a race is lost, are
/// counted as cancelled.
#[derive(Clone, Debug)]
pub struct MockProvider {
    info: ProviderInfo,
    ledger: InMemoryLedger,
    state: Arc<Mutex<State>>,
}

impl MockProvider {
    /// A provider that answers every call immediately.
    pub fn new(info: ProviderInfo, ledger: InMemoryLedger) -> Self {
        Self {
            info,
            ledger,
            state: Default::default(),
        }
    }

    /// The provider's registry record.
    pub fn info(&self) -> &ProviderInfo {
        &self.info
    }

    /// Delay every call to `op` by `delay`.
    pub fn set_delay(&self, op: &'static str, delay: Duration) {
        self.state.lock().delays.insert(op, delay);
    }

    /// Fail every call to `op` with HTTP `status`.
    pub fn set_failure(&self, op: &'static str, status: u16) {
        self.state.lock().failures.insert(op, status);
    }

    /// Stop failing `op`.
    pub fn clear_failure(&self, op: &'static str) {
        self.state.lock().failures.remove(op);
    }

    /// Report newly uploaded pieces as not parked for the first `polls`
    /// lookups.
    pub fn set_parking_polls(&self, polls: usize) {
        self.state.lock().parking_polls = polls;
    }

    /// Answer root additions without a transaction handle.
    pub fn set_legacy_roots(&self, legacy: bool) {
        self.state.lock().legacy_roots = legacy;
    }

    /// Fail every download after its first half has been sent.
    pub fn break_downloads(&self) {
        self.state.lock().break_downloads = true;
    }

    /// Keep submitted transactions out of the ledger, so only the provider's
    /// status endpoints know them.
    pub fn hide_transactions(&self) {
        self.state.lock().hide_transactions = true;
    }

    /// Leave creation transactions pending forever.
    pub fn stall_creation(&self) {
        self.state.lock().creation_script = TxScript::Stall;
    }

    /// Revert creation transactions.
    pub fn reject_creation(&self) {
        self.state.lock().creation_script = TxScript::Reject;
    }

    /// Keep created proof sets from going live.
    pub fn hold_liveness(&self) {
        self.state.lock().hold_liveness = true;
    }

    /// Leave root addition transactions pending forever.
    pub fn stall_root_addition(&self) {
        self.state.lock().addition_script = TxScript::Stall;
    }

    /// Revert root addition transactions.
    pub fn reject_root_addition(&self) {
        self.state.lock().addition_script = TxScript::Reject;
    }

    /// Store a piece as if it had been uploaded and parked.
    pub fn insert_piece(&self, data: &[u8]) -> PieceCommitment {
        let piece = tessera_piece::compute(data).unwrap_or_else(|e| panic!("test payload: {e}"));
        self.state
            .lock()
            .pieces
            .insert(piece.legacy_digest(), Bytes::copy_from_slice(data));
        piece
    }

    /// Serve `data` for `piece` instead of the stored payload.
    pub fn serve_bytes(&self, piece: &PieceCommitment, data: impl Into<Bytes>) {
        self.state.lock().served.insert(piece.legacy_digest(), data.into());
    }

    /// The stored payload for `piece`.
    pub fn stored(&self, piece: &PieceCommitment) -> Option<Bytes> {
        self.state.lock().pieces.get(&piece.legacy_digest()).cloned()
    }

    /// Calls made to `op`, including cancelled ones.
    pub fn calls(&self, op: &str) -> usize {
        self.state.lock().calls.get(op).copied().unwrap_or_default()
    }

    /// Calls to `op` dropped before completing.
    pub fn cancelled(&self, op: &str) -> usize {
        self.state.lock().cancelled.get(op).copied().unwrap_or_default()
    }

    /// Calls to any operation dropped before completing.
    pub fn cancelled_total(&self) -> usize {
        self.state.lock().cancelled.values().sum()
    }

    /// Count the call, apply the scripted delay and failure.
    async fn enter(&self, op: &'static str) -> Result<()> {
        let guard = CallGuard::new(self, op);
        let delay = self.state.lock().delays.get(op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        guard.finish();

        match self.state.lock().failures.get(op) {
            Some(&status) => Err(ProviderError::Http {
                operation: op,
                status,
                body: "scripted failure".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn next_tx(&self) -> TxHash {
        let mut state = self.state.lock();
        state.next_tx += 1;
        keccak256([self.info.owner.as_slice(), &state.next_tx.to_be_bytes()].concat())
    }

    fn record_tx(&self, tx: TxHash, script: TxScript) {
        if self.state.lock().hide_transactions {
            return;
        }
        match script {
            TxScript::Confirm => self.ledger.set_transaction(tx, TxStatus::Confirmed),
            TxScript::Stall => self.ledger.set_transaction(tx, TxStatus::Pending),
            TxScript::Reject => self.ledger.set_transaction(tx, TxStatus::Rejected),
        }
    }

    fn bad_request(op: &'static str, error: impl ToString) -> ProviderError {
        ProviderError::Http {
            operation: op,
            status: 400,
            body: error.to_string(),
        }
    }

    fn not_found(op: &'static str) -> ProviderError {
        ProviderError::Http {
            operation: op,
            status: 404,
            body: "not found".to_string(),
        }
    }
}

/// Counts a call on creation and a cancellation if dropped unfinished.
struct CallGuard<'a> {
    provider: &'a MockProvider,
    op: &'static str,
    finished: bool,
}

impl<'a> CallGuard<'a> {
    fn new(provider: &'a MockProvider, op: &'static str) -> Self {
        *provider.state.lock().calls.entry(op).or_default() += 1;
        Self {
            provider,
            op,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.provider.state.lock().cancelled.entry(self.op).or_default() += 1;
        }
    }
}

#[async_trait]
impl PdpProvider for MockProvider {
    fn owner(&self) -> Address {
        self.info.owner
    }

    async fn ping(&self) -> Result<()> {
        self.enter(ops::PING).await
    }

    async fn find_piece(&self, piece: &PieceCommitment, _size: u64) -> Result<bool> {
        self.enter(ops::FIND_PIECE).await?;
        let digest = piece.legacy_digest();
        let mut state = self.state.lock();
        if !state.pieces.contains_key(&digest) {
            return Ok(false);
        }
        match state.parking.get_mut(&digest) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    async fn check_piece(&self, piece: &PieceCommitment, _size: u64) -> Result<UploadSession> {
        self.enter(ops::CHECK_PIECE).await?;
        let mut state = self.state.lock();
        if state.pieces.contains_key(&piece.legacy_digest()) {
            return Ok(UploadSession::AlreadyHeld);
        }

        let upload_url = self
            .info
            .pdp_url
            .join(&format!("pdp/piece/upload/{}", state.sessions.len() + 1))?;
        state.sessions.insert(upload_url.clone(), *piece);
        Ok(UploadSession::Open { upload_url })
    }

    async fn put_piece(&self, session: &UploadSession, data: Bytes) -> Result<()> {
        self.enter(ops::PUT_PIECE).await?;
        let UploadSession::Open { upload_url } = session else {
            return Ok(());
        };

        let mut state = self.state.lock();
        let piece = state
            .sessions
            .remove(upload_url)
            .ok_or_else(|| Self::not_found(ops::PUT_PIECE))?;
        let digest = piece.legacy_digest();
        let polls = state.parking_polls;
        state.pieces.insert(digest, data);
        state.parking.insert(digest, polls);
        Ok(())
    }

    async fn download_piece(&self, piece: &PieceCommitment) -> Result<ByteStream> {
        self.enter(ops::DOWNLOAD_PIECE).await?;
        let digest = piece.legacy_digest();
        let state = self.state.lock();
        let data = state
            .served
            .get(&digest)
            .or_else(|| state.pieces.get(&digest))
            .cloned()
            .ok_or_else(|| ProviderError::PieceNotFound(piece.to_string()))?;

        // Two chunks so consumers exercise reassembly.
        let split = data.len() / 2;
        let rest = if state.break_downloads {
            Err(ProviderError::InvalidResponse {
                operation: ops::DOWNLOAD_PIECE,
                reason: "connection reset mid-body".to_string(),
            })
        } else {
            Ok(data.slice(split..))
        };
        let chunks = vec![Ok(data.slice(..split)), rest];
        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn create_proof_set(&self, request: &CreateProofSetRequest) -> Result<TxHash> {
        const OP: &str = ops::CREATE_PROOF_SET;
        self.enter(OP).await?;

        let bytes = hex::decode(&request.extra_data)
            .map_err(|e| Self::bad_request(OP, e))?;
        let (payer, with_cdn, _signature) = <(Address, bool, AbiBytes)>::abi_decode_params(&bytes)
            .map_err(|e| Self::bad_request(OP, e))?;
        let client_dataset_id = tessera_directory::ServiceRegistry::next_client_dataset_id(
            &self.ledger,
            payer,
        )
        .await
        .map_err(|e| Self::bad_request(OP, e))?;

        let tx = self.next_tx();
        let (script, hold_liveness) = {
            let state = self.state.lock();
            (state.creation_script, state.hold_liveness)
        };
        self.record_tx(tx, script);

        if script == TxScript::Confirm {
            let record =
                self.ledger
                    .create_proof_set(payer, self.info.owner, client_dataset_id, with_cdn);
            if !hold_liveness {
                self.ledger.mark_live(record.pdp_proof_set_id);
            }
            self.state.lock().creations.insert(tx, record.pdp_proof_set_id);
        }
        Ok(tx)
    }

    async fn creation_status(&self, tx: TxHash) -> Result<CreationStatus> {
        self.enter(ops::CREATION_STATUS).await?;
        let state = self.state.lock();
        let proof_set_id = state.creations.get(&tx).copied();
        let tx_status = match state.creation_script {
            TxScript::Confirm => TxStatus::Confirmed,
            TxScript::Stall => TxStatus::Pending,
            TxScript::Reject => TxStatus::Rejected,
        };

        Ok(CreationStatus {
            create_message_hash: tx,
            proof_set_created: proof_set_id.is_some(),
            service: "tessera-mock".to_string(),
            tx_status,
            ok: tx_status.is_final().then_some(tx_status == TxStatus::Confirmed),
            proof_set_id,
        })
    }

    async fn proof_set(&self, id: ProofSetId) -> Result<ProofSetDetails> {
        self.enter(ops::PROOF_SET).await?;
        let set = self
            .ledger
            .proof_set(id)
            .ok_or_else(|| Self::not_found(ops::PROOF_SET))?;

        Ok(ProofSetDetails {
            id,
            roots: set
                .roots
                .iter()
                .map(|root| RootDetails {
                    root_id: root.root_id,
                    root_cid: root.piece.to_legacy_string(),
                })
                .collect(),
            next_challenge_epoch: None,
        })
    }

    async fn add_roots(&self, id: ProofSetId, request: &AddRootsRequest) -> Result<RootSubmission> {
        const OP: &str = ops::ADD_ROOTS;
        self.enter(OP).await?;
        if self.ledger.proof_set(id).is_none() {
            return Err(Self::not_found(OP));
        }

        let roots = request
            .roots
            .iter()
            .map(|entry| -> Result<RootData> {
                let piece: PieceCommitment = entry
                    .root_cid
                    .parse()
                    .map_err(|e| Self::bad_request(OP, e))?;
                let raw_size = self.stored(&piece).map_or(0, |data| data.len() as u64);
                Ok(RootData { piece, raw_size })
            })
            .collect::<Result<Vec<_>>>()?;

        let (legacy, script) = {
            let state = self.state.lock();
            (state.legacy_roots, state.addition_script)
        };
        if legacy {
            self.ledger.add_roots(id, &roots);
            return Ok(RootSubmission::Legacy);
        }

        let tx = self.next_tx();
        self.record_tx(tx, script);
        let root_ids = if script == TxScript::Confirm {
            self.ledger.add_roots(id, &roots)
        } else {
            Vec::new()
        };
        self.state.lock().additions.insert(tx, (id, root_ids));
        Ok(RootSubmission::Submitted { tx_hash: tx })
    }

    async fn root_addition_status(&self, id: ProofSetId, tx: TxHash) -> Result<RootAdditionStatus> {
        const OP: &str = ops::ROOT_ADDITION_STATUS;
        self.enter(OP).await?;
        let state = self.state.lock();
        let (proof_set_id, root_ids) = state
            .additions
            .get(&tx)
            .filter(|(set, _)| *set == id)
            .cloned()
            .ok_or_else(|| Self::not_found(OP))?;
        let tx_status = match state.addition_script {
            TxScript::Confirm => TxStatus::Confirmed,
            TxScript::Stall => TxStatus::Pending,
            TxScript::Reject => TxStatus::Rejected,
        };

        Ok(RootAdditionStatus {
            tx_hash: tx,
            tx_status,
            proof_set_id,
            root_count: root_ids.len() as u64,
            add_message_ok: tx_status.is_final().then_some(tx_status == TxStatus::Confirmed),
            confirmed_root_ids: (tx_status == TxStatus::Confirmed).then_some(root_ids),
        })
    }
}
