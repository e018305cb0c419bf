//! The proof set coordinator.

use rand::seq::SliceRandom;
use std::sync::Arc;
use tessera_directory::ProviderDirectory;
use tessera_primitives::{
    Address, ClientDatasetId, ProofSetId, ProviderId, ProviderInfo, RootData, RootId, TxHash,
    TxStatus,
};
use tessera_provider::{
    AddRootsRequest, CreateProofSetRequest, PdpProvider, ProviderConnector, ProviderError,
    RootSubmission,
};
use tessera_signer::SigningIdentity;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    CoordinatorConfig, CoordinatorEvent, ProofSetError, Resolution, Result, SelectionOptions,
    StorageTarget, UploadObserver, UploadTask, poll_until, rank_proof_sets,
};

/// Resolves where an upload goes, creates proof sets when needed and adds
/// roots to them.
///
/// Each call drives one [`UploadTask`] through its lifecycle. The coordinator
/// itself holds no per-upload state and can be shared.
#[derive(Clone)]
pub struct ProofSetCoordinator {
    directory: ProviderDirectory,
    connector: Arc<dyn ProviderConnector>,
    identity: Arc<dyn SigningIdentity>,
    config: CoordinatorConfig,
}

impl std::fmt::Debug for ProofSetCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofSetCoordinator")
            .field("client", &self.identity.address())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProofSetCoordinator {
    /// Create a coordinator acting for `identity`.
    pub fn new(
        directory: ProviderDirectory,
        connector: Arc<dyn ProviderConnector>,
        identity: Arc<dyn SigningIdentity>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            directory,
            connector,
            identity,
            config,
        }
    }

    /// The directory queries go through.
    pub fn directory(&self) -> &ProviderDirectory {
        &self.directory
    }

    /// The connector providers are reached through.
    pub fn connector(&self) -> &Arc<dyn ProviderConnector> {
        &self.connector
    }

    /// Polling configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// The client address uploads are paid by.
    pub fn client(&self) -> Address {
        self.identity.address()
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// Resolve a live proof set for the upload, creating one if none fits.
    ///
    /// Leaves `task` in [`Ready`](crate::CoordinatorState::Ready) on success.
    pub async fn prepare(
        &self,
        task: &mut UploadTask,
        options: &SelectionOptions,
        observer: &dyn UploadObserver,
    ) -> Result<StorageTarget> {
        let target = match self.resolve(task, options, observer).await? {
            Resolution::Existing {
                provider,
                proof_set,
            } => {
                task.apply(CoordinatorEvent::Accepted)?;
                StorageTarget {
                    handle: self.connector.connect(&provider),
                    provider,
                    proof_set_id: proof_set.pdp_proof_set_id,
                    client_dataset_id: proof_set.client_dataset_id,
                    with_cdn: proof_set.with_cdn,
                    created: false,
                }
            }
            Resolution::Create { provider } => {
                self.create_proof_set(task, provider, options.with_cdn, observer)
                    .await?
            }
        };

        info!(
            provider = %target.provider.owner,
            proof_set_id = target.proof_set_id,
            created = target.created,
            "Proof set resolved"
        );
        observer.proof_set_resolved(&target);
        Ok(target)
    }

    /// Choose a provider and, if possible, an existing proof set.
    ///
    /// Moves `task` to `ExistingFound` or `CreatingNew`.
    pub async fn resolve(
        &self,
        task: &mut UploadTask,
        options: &SelectionOptions,
        observer: &dyn UploadObserver,
    ) -> Result<Resolution> {
        let resolution = if let Some(id) = options.proof_set_id {
            self.resolve_explicit_set(id, options).await?
        } else if let Some(provider) = self.resolve_explicit_provider(options).await? {
            let sets = self.directory.proof_sets_for_client(self.client()).await?;
            match rank_proof_sets(&sets, options.with_cdn, Some(provider.owner)).first() {
                Some(set) => Resolution::Existing {
                    provider,
                    proof_set: (*set).clone(),
                },
                None => Resolution::Create { provider },
            }
        } else {
            self.resolve_automatically(options.with_cdn).await?
        };

        let event = match &resolution {
            Resolution::Existing { .. } => CoordinatorEvent::ExistingSelected,
            Resolution::Create { .. } => CoordinatorEvent::CreationRequired,
        };
        task.apply(event)?;
        observer.provider_selected(resolution.provider());
        Ok(resolution)
    }

    async fn resolve_explicit_set(
        &self,
        id: ProofSetId,
        options: &SelectionOptions,
    ) -> Result<Resolution> {
        let client = self.client();
        let set = self
            .directory
            .proof_sets_for_client(client)
            .await?
            .into_iter()
            .find(|set| set.pdp_proof_set_id == id)
            .ok_or(ProofSetError::ProofSetNotFound {
                proof_set_id: id,
                client,
            })?;

        if let Some(address) = options.provider_address {
            if address != set.payee {
                return Err(ProofSetError::InconsistentSelection(format!(
                    "proof set {id} is stored by {}, not {address}",
                    set.payee
                )));
            }
        }
        if let Some(provider_id) = options.provider_id {
            let provider = self.provider_by_id(provider_id).await?;
            if provider.owner != set.payee {
                return Err(ProofSetError::InconsistentSelection(format!(
                    "proof set {id} is stored by {}, not provider {provider_id} ({})",
                    set.payee, provider.owner
                )));
            }
        }

        if !set.is_live {
            return Err(ProofSetError::ProofSetNotLive(id));
        }
        if !set.is_managed {
            return Err(ProofSetError::InconsistentSelection(format!(
                "proof set {id} is not managed by service {}",
                self.directory.service_address()
            )));
        }

        let provider = self
            .directory
            .resolve_by_address(set.payee)
            .await?
            .ok_or_else(|| ProofSetError::ProviderNotFound(set.payee.to_string()))?;
        Ok(Resolution::Existing {
            provider,
            proof_set: set,
        })
    }

    /// The provider named by id and/or address, if any. Both naming
    /// different providers is an error.
    async fn resolve_explicit_provider(
        &self,
        options: &SelectionOptions,
    ) -> Result<Option<ProviderInfo>> {
        let by_id = match options.provider_id {
            Some(id) => Some(self.provider_by_id(id).await?),
            None => None,
        };
        let by_address = match options.provider_address {
            Some(address) => Some(
                self.directory
                    .resolve_by_address(address)
                    .await?
                    .ok_or_else(|| ProofSetError::ProviderNotFound(address.to_string()))?,
            ),
            None => None,
        };

        match (by_id, by_address) {
            (Some(a), Some(b)) if a.id != b.id => Err(ProofSetError::InconsistentSelection(
                format!("provider {} is registered at {}, not {}", a.id, a.owner, b.owner),
            )),
            (Some(provider), _) | (None, Some(provider)) => Ok(Some(provider)),
            (None, None) => Ok(None),
        }
    }

    async fn provider_by_id(&self, id: ProviderId) -> Result<ProviderInfo> {
        self.directory
            .resolve_by_id(id)
            .await?
            .ok_or_else(|| ProofSetError::ProviderNotFound(format!("id {id}")))
    }

    /// Prefer the caller's best existing proof set; otherwise a random
    /// approved provider that answers a ping.
    async fn resolve_automatically(&self, with_cdn: bool) -> Result<Resolution> {
        let sets = self.directory.proof_sets_for_client(self.client()).await?;
        for set in rank_proof_sets(&sets, with_cdn, None) {
            match self.directory.resolve_by_address(set.payee).await? {
                Some(provider) => {
                    debug!(
                        proof_set_id = set.pdp_proof_set_id,
                        provider = %provider.owner,
                        root_count = set.root_count,
                        "Reusing existing proof set"
                    );
                    return Ok(Resolution::Existing {
                        provider,
                        proof_set: set.clone(),
                    });
                }
                None => debug!(
                    proof_set_id = set.pdp_proof_set_id,
                    payee = %set.payee,
                    "Skipping proof set of unapproved provider"
                ),
            }
        }

        let mut providers = self.directory.list_approved().await?;
        providers.shuffle(&mut rand::rng());

        let tried = providers.len();
        for provider in providers {
            match self.connector.connect(&provider).ping().await {
                Ok(()) => return Ok(Resolution::Create { provider }),
                Err(error) => warn!(
                    provider = %provider.owner,
                    %error,
                    "Provider failed ping, trying next"
                ),
            }
        }
        Err(ProofSetError::NoProviderAvailable { tried })
    }

    // ------------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------------

    /// Create a proof set with `provider` and wait for it to go live.
    ///
    /// `task` must be in `CreatingNew`. A single deadline covers every
    /// waiting step; there is no automatic retry.
    pub async fn create_proof_set(
        &self,
        task: &mut UploadTask,
        provider: ProviderInfo,
        with_cdn: bool,
        observer: &dyn UploadObserver,
    ) -> Result<StorageTarget> {
        let handle = self.connector.connect(&provider);
        let started = Instant::now();

        match self
            .run_creation(task, &provider, &*handle, with_cdn, observer)
            .await
        {
            Ok((proof_set_id, client_dataset_id)) => {
                metrics::counter!("tessera_proof_sets_created_total").increment(1);
                metrics::histogram!("tessera_proof_set_creation_seconds")
                    .record(started.elapsed().as_secs_f64());
                Ok(StorageTarget {
                    provider,
                    handle,
                    proof_set_id,
                    client_dataset_id,
                    with_cdn,
                    created: true,
                })
            }
            Err(error) => {
                fail(task, &error);
                Err(error)
            }
        }
    }

    async fn run_creation(
        &self,
        task: &mut UploadTask,
        provider: &ProviderInfo,
        handle: &dyn PdpProvider,
        with_cdn: bool,
        observer: &dyn UploadObserver,
    ) -> Result<(ProofSetId, ClientDatasetId)> {
        let client = self.client();
        let client_dataset_id = self.directory.next_client_dataset_id(client).await?;
        let auth = self
            .identity
            .sign_create_proof_set(client_dataset_id, provider.owner, with_cdn)
            .await?;
        let request = CreateProofSetRequest {
            record_keeper: self.directory.service_address(),
            extra_data: auth.create_proof_set_extra_data(client, with_cdn),
        };

        info!(
            provider = %provider.owner,
            client_dataset_id,
            with_cdn,
            "Creating proof set"
        );
        let tx_hash = handle
            .create_proof_set(&request)
            .await
            .map_err(ProofSetError::provider(provider.owner))?;
        task.apply(CoordinatorEvent::CreateSubmitted)?;
        observer.creation_started(tx_hash);

        let poll = self.config.creation;
        let deadline = Instant::now() + poll.timeout;
        let timeout = |task: &UploadTask| ProofSetError::ProofSetCreationTimeout {
            stage: task.state(),
            timeout: poll.timeout,
        };

        // Mined.
        let owner = provider.owner;
        let mined = poll_until(poll.interval, deadline, || async move {
            let status = match self.tx_status(tx_hash).await? {
                Some(status) => Some(status),
                None => reported_tx_status(
                    owner,
                    tx_hash,
                    handle.creation_status(tx_hash).await.map(|s| s.tx_status),
                )?,
            };
            match status {
                Some(TxStatus::Confirmed) => Ok(Some(())),
                Some(TxStatus::Rejected) => Err(ProofSetError::CreationFailed {
                    tx_hash,
                    reason: "transaction rejected".to_string(),
                }),
                _ => Ok(None),
            }
        })
        .await?;
        if mined.is_none() {
            return Err(timeout(task));
        }
        task.apply(CoordinatorEvent::CreateMined)?;

        // Reported by the provider.
        let reported = poll_until(poll.interval, deadline, || async move {
            let status = match handle.creation_status(tx_hash).await {
                Ok(status) => status,
                Err(error) if error.is_transient() => {
                    debug!(%tx_hash, %error, "Creation status not available yet");
                    return Ok(None);
                }
                Err(error) => return Err(ProofSetError::provider(owner)(error)),
            };
            observer.creation_progress(&status);

            if status.is_failed() {
                return Err(ProofSetError::CreationFailed {
                    tx_hash,
                    reason: format!("provider reported {:?}", status.tx_status),
                });
            }
            debug!(%tx_hash, created = status.proof_set_created, "Polled creation status");
            Ok(status.proof_set_created.then_some(status.proof_set_id).flatten())
        })
        .await?;
        let Some(proof_set_id) = reported else {
            return Err(timeout(task));
        };
        task.apply(CoordinatorEvent::CreateConfirmed)?;

        // Live on the verifier.
        let live = poll_until(poll.interval, deadline, || async move {
            match self.directory.proof_set_live(proof_set_id).await {
                Ok(live) => Ok(live.then_some(())),
                Err(error) if error.is_transient() => {
                    debug!(proof_set_id, %error, "Liveness check failed, retrying");
                    Ok(None)
                }
                Err(error) => Err(ProofSetError::from(error)),
            }
        })
        .await?;
        if live.is_none() {
            return Err(timeout(task));
        }
        task.apply(CoordinatorEvent::Live)?;

        info!(proof_set_id, provider = %owner, "Proof set live");
        Ok((proof_set_id, client_dataset_id))
    }

    /// Ledger status of `tx`, or `None` while the ledger is unreachable or
    /// has no record of it.
    async fn tx_status(&self, tx: TxHash) -> Result<Option<TxStatus>> {
        match self.directory.transaction_status(tx).await {
            Ok(status) => Ok(status),
            Err(error) if error.is_transient() => {
                debug!(%tx, %error, "Transaction status unavailable, retrying");
                Ok(None)
            }
            Err(error) => Err(error.into()),
        }
    }

    // ------------------------------------------------------------------------
    // Root addition
    // ------------------------------------------------------------------------

    /// Add `roots` to the target proof set in one transaction and wait for
    /// their ids.
    ///
    /// `task` must be [`Ready`](crate::CoordinatorState::Ready). Confirmed
    /// ids are reported to `observer` exactly once.
    pub async fn add_roots(
        &self,
        task: &mut UploadTask,
        target: &StorageTarget,
        roots: &[RootData],
        observer: &dyn UploadObserver,
    ) -> Result<Vec<RootId>> {
        if roots.is_empty() {
            return Err(ProofSetError::NoRoots);
        }
        task.apply(CoordinatorEvent::AddRoots)?;

        match self.run_root_addition(task, target, roots, observer).await {
            Ok(root_ids) => {
                info!(
                    proof_set_id = target.proof_set_id,
                    provider = %target.provider.owner,
                    ?root_ids,
                    "Roots confirmed"
                );
                observer.roots_confirmed(&root_ids);
                Ok(root_ids)
            }
            Err(error) => {
                fail(task, &error);
                Err(error)
            }
        }
    }

    async fn run_root_addition(
        &self,
        task: &mut UploadTask,
        target: &StorageTarget,
        roots: &[RootData],
        observer: &dyn UploadObserver,
    ) -> Result<Vec<RootId>> {
        let proof_set_id = target.proof_set_id;
        let owner = target.provider.owner;
        let handle = &*target.handle;

        let first_root_id = self.directory.next_root_id(proof_set_id).await?;
        let auth = self
            .identity
            .sign_add_roots(target.client_dataset_id, first_root_id, roots)
            .await?;
        let request = AddRootsRequest::new(roots, auth.add_roots_extra_data());

        debug!(proof_set_id, first_root_id, count = roots.len(), "Adding roots");
        let submission = handle
            .add_roots(proof_set_id, &request)
            .await
            .map_err(ProofSetError::provider(owner))?;
        observer.roots_added(&submission);

        let tx_hash = match submission {
            RootSubmission::Legacy => {
                task.apply(CoordinatorEvent::RootsAcknowledged)?;
                return Ok((first_root_id..first_root_id + roots.len() as u64).collect());
            }
            RootSubmission::Submitted { tx_hash } => tx_hash,
        };
        task.apply(CoordinatorEvent::RootsSubmitted)?;

        let poll = self.config.root_addition;
        let deadline = Instant::now() + poll.timeout;
        let timeout = |task: &UploadTask| ProofSetError::RootAdditionTimeout {
            proof_set_id,
            stage: task.state(),
            timeout: poll.timeout,
        };
        let failed = |reason: String| ProofSetError::RootAdditionFailed {
            proof_set_id,
            tx_hash,
            reason,
        };

        // Mined.
        let mined = poll_until(poll.interval, deadline, || async move {
            let status = match self.tx_status(tx_hash).await? {
                Some(status) => Some(status),
                None => reported_tx_status(
                    owner,
                    tx_hash,
                    handle
                        .root_addition_status(proof_set_id, tx_hash)
                        .await
                        .map(|s| s.tx_status),
                )?,
            };
            match status {
                Some(TxStatus::Confirmed) => Ok(Some(())),
                Some(TxStatus::Rejected) => Err(failed("transaction rejected".to_string())),
                _ => Ok(None),
            }
        })
        .await?;
        if mined.is_none() {
            return Err(timeout(task));
        }
        task.apply(CoordinatorEvent::RootsMined)?;

        // Root ids reported by the provider.
        let confirmed = poll_until(poll.interval, deadline, || async move {
            let status = match handle.root_addition_status(proof_set_id, tx_hash).await {
                Ok(status) => status,
                Err(error) if error.is_transient() => {
                    debug!(%tx_hash, %error, "Root addition status not available yet");
                    return Ok(None);
                }
                Err(error) => return Err(ProofSetError::provider(owner)(error)),
            };

            if status.is_failed() {
                return Err(failed(format!("provider reported {:?}", status.tx_status)));
            }
            Ok(status.confirmed_root_ids)
        })
        .await?;
        let Some(root_ids) = confirmed else {
            return Err(timeout(task));
        };
        task.apply(CoordinatorEvent::RootsConfirmed)?;
        Ok(root_ids)
    }
}

/// A transaction's status as its provider reports it, for transactions the
/// ledger does not know. Transient provider failures read as pending.
fn reported_tx_status(
    owner: Address,
    tx: TxHash,
    reported: std::result::Result<TxStatus, ProviderError>,
) -> Result<Option<TxStatus>> {
    match reported {
        Ok(status) => {
            debug!(%tx, provider = %owner, ?status, "Using provider-reported transaction status");
            Ok(Some(status))
        }
        Err(error) if error.is_transient() => {
            debug!(%tx, %error, "Transaction unknown to ledger and provider, retrying");
            Ok(None)
        }
        Err(error) => Err(ProofSetError::provider(owner)(error)),
    }
}

/// Move `task` to its phase's failure state, if it is in one.
fn fail(task: &mut UploadTask, error: &ProofSetError) {
    let stage = task.state();
    if let Ok(state) = task.apply(CoordinatorEvent::Failed) {
        warn!(%stage, %state, %error, "Upload task failed");
    }
}
