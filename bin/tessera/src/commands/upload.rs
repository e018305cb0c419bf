//! `tessera upload`.
//!
//! The ledger snapshot has no chain behind it, so proof sets and roots the
//! provider reports are recorded into it as the upload progresses and the
//! snapshot is saved once the upload succeeds.

use bytes::Bytes;
use eyre::{Result, WrapErr};
use parking_lot::Mutex;
use tessera_client::{SelectionOptions, UploadResult};
use tessera_directory::{InMemoryLedger, LedgerProofSet, ProofSetRecord};
use tessera_piece::PieceCommitment;
use tessera_primitives::{Address, ClientDatasetId, ProviderInfo, RootData, RootId, TxHash};
use tessera_proofset::{StorageTarget, UploadObserver};
use tessera_provider::{CreationStatus, RootSubmission};
use tracing::{debug, info};

use crate::{cli::UploadArgs, commands::open, config::TesseraConfig};

/// Logs upload progress and records provider-reported state in the ledger.
struct UploadProgress {
    ledger: InMemoryLedger,
    client: Address,
    with_cdn: bool,
    /// Provider and dataset id of a creation in flight.
    creating: Mutex<Option<(Address, ClientDatasetId)>>,
    selected: Mutex<Option<Address>>,
}

impl UploadProgress {
    fn new(ledger: InMemoryLedger, client: Address, with_cdn: bool) -> Self {
        Self {
            ledger,
            client,
            with_cdn,
            creating: Mutex::new(None),
            selected: Mutex::new(None),
        }
    }

    /// Dataset id the service assigns to the client's next proof set.
    fn next_client_dataset_id(&self) -> ClientDatasetId {
        self.ledger
            .snapshot()
            .proof_sets
            .iter()
            .filter(|set| set.record.payer == self.client)
            .map(|set| set.record.client_dataset_id + 1)
            .max()
            .unwrap_or(0)
    }

    /// Record the stored piece as a root, unless the ledger already has it.
    fn record_root(&self, result: &UploadResult) {
        let Some(set) = self.ledger.proof_set(result.proof_set_id) else {
            return;
        };
        if set.next_root_id > result.root_id {
            return;
        }
        let root = RootData {
            piece: result.piece,
            raw_size: result.size,
        };
        self.ledger.add_roots(result.proof_set_id, &[root]);
    }
}

impl UploadObserver for UploadProgress {
    fn provider_selected(&self, provider: &ProviderInfo) {
        info!(id = provider.id, owner = %provider.owner, url = %provider.pdp_url, "Selected provider");
        *self.selected.lock() = Some(provider.owner);
    }

    fn proof_set_resolved(&self, target: &StorageTarget) {
        info!(proof_set_id = target.proof_set_id, created = target.created, "Using proof set");
    }

    fn creation_started(&self, tx_hash: TxHash) {
        info!(%tx_hash, "Creating proof set");
        if let Some(payee) = *self.selected.lock() {
            *self.creating.lock() = Some((payee, self.next_client_dataset_id()));
        }
    }

    fn creation_progress(&self, status: &CreationStatus) {
        info!(
            created = status.proof_set_created,
            proof_set_id = ?status.proof_set_id,
            "Proof set creation in progress"
        );
        let (true, Some(id)) = (status.proof_set_created, status.proof_set_id) else {
            return;
        };
        if self.ledger.proof_set(id).is_some() {
            return;
        }
        let Some((payee, client_dataset_id)) = self.creating.lock().take() else {
            return;
        };

        debug!(proof_set_id = id, %payee, "Recording proof set in ledger");
        self.ledger.insert_proof_set(LedgerProofSet {
            record: ProofSetRecord {
                pdp_proof_set_id: id,
                rail_id: id,
                payer: self.client,
                payee,
                client_dataset_id,
                with_cdn: self.with_cdn,
            },
            is_live: true,
            listener: self.ledger.snapshot().service,
            next_root_id: 0,
            roots: Vec::new(),
        });
    }

    fn upload_complete(&self, piece: &PieceCommitment) {
        info!(%piece, "Piece stored by provider");
    }

    fn roots_added(&self, submission: &RootSubmission) {
        match submission {
            RootSubmission::Submitted { tx_hash } => info!(%tx_hash, "Adding root"),
            RootSubmission::Legacy => info!("Adding root"),
        }
    }

    fn roots_confirmed(&self, root_ids: &[RootId]) {
        info!(?root_ids, "Root confirmed");
    }
}

pub(crate) async fn run(config: &TesseraConfig, args: &UploadArgs) -> Result<()> {
    let data = tokio::fs::read(&args.file)
        .await
        .wrap_err_with(|| format!("failed to read {}", args.file.display()))?;
    let (client, ledger) = open(config)?;

    let options = SelectionOptions {
        provider_id: args.provider_id,
        provider_address: args.provider_address,
        proof_set_id: args.proof_set_id,
        with_cdn: args.cdn,
    };
    let progress = UploadProgress::new(ledger.clone(), client.address(), args.cdn);
    let result = client
        .upload_with_observer(Bytes::from(data), &options, &progress)
        .await?;

    progress.record_root(&result);
    ledger
        .save(&config.ledger)
        .wrap_err_with(|| format!("failed to save ledger {}", config.ledger.display()))?;

    println!("piece:        {}", result.piece);
    println!("size:         {}", result.size);
    println!("root id:      {}", result.root_id);
    println!("proof set id: {}", result.proof_set_id);
    println!("provider:     {}", result.provider);
    Ok(())
}
