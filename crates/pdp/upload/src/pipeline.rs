//! The upload pipeline.

use bytes::Bytes;
use tessera_piece::PieceCommitment;
use tessera_primitives::{Address, ProofSetId, RootData, RootId};
use tessera_proofset::{
    ProofSetCoordinator, SelectionOptions, StorageTarget, UploadObserver, UploadTask, poll_until,
};
use tessera_provider::UploadSession;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{Result, UploadConfig, UploadError, UploadPhase};

/// A stored and committed upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadResult {
    /// Commitment naming the data.
    pub piece: PieceCommitment,
    /// Payload size in bytes.
    pub size: u64,
    /// Root id assigned in the proof set.
    pub root_id: RootId,
    /// Proof set holding the root.
    pub proof_set_id: ProofSetId,
    /// Provider storing the data.
    pub provider: Address,
}

/// Drives one blob from bytes to a confirmed root.
///
/// Steps run strictly in order: size validation, commitment, target
/// resolution, hand-off, parking, root addition. Each call submits exactly
/// one root addition.
#[derive(Debug, Clone)]
pub struct UploadPipeline {
    coordinator: ProofSetCoordinator,
    config: UploadConfig,
}

impl UploadPipeline {
    /// Create a pipeline.
    pub fn new(coordinator: ProofSetCoordinator, config: UploadConfig) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    /// The coordinator targets are resolved with.
    pub fn coordinator(&self) -> &ProofSetCoordinator {
        &self.coordinator
    }

    /// Upload limits.
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload `data`.
    pub async fn upload(
        &self,
        data: Bytes,
        options: &SelectionOptions,
        observer: &dyn UploadObserver,
    ) -> Result<UploadResult> {
        let size = data.len() as u64;
        if !self.config.accepts(size) {
            return Err(UploadError::InvalidSize {
                size,
                min: self.config.min_size,
                max: self.config.max_size,
            });
        }

        let started = Instant::now();
        let result = self.run(data, size, options, observer).await;

        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("tessera_uploads_total", "outcome" => outcome).increment(1);
        if result.is_ok() {
            metrics::histogram!("tessera_upload_bytes").record(size as f64);
            metrics::histogram!("tessera_upload_seconds").record(started.elapsed().as_secs_f64());
        }
        result
    }

    async fn run(
        &self,
        data: Bytes,
        size: u64,
        options: &SelectionOptions,
        observer: &dyn UploadObserver,
    ) -> Result<UploadResult> {
        let piece = tessera_piece::compute(&data)?;
        debug!(%piece, size, "Computed piece commitment");

        let mut task = UploadTask::new();
        let target = self.coordinator.prepare(&mut task, options, observer).await?;

        self.hand_off(&target, piece, data).await?;
        self.wait_for_parking(&target, piece, size).await?;
        observer.upload_complete(&piece);

        let root = RootData {
            piece,
            raw_size: size,
        };
        let root_ids = self
            .coordinator
            .add_roots(&mut task, &target, &[root], observer)
            .await?;
        let root_id = root_ids
            .first()
            .copied()
            .ok_or(UploadError::MissingRootId(piece))?;

        info!(
            %piece,
            size,
            root_id,
            proof_set_id = target.proof_set_id,
            provider = %target.provider.owner,
            "Upload complete"
        );
        Ok(UploadResult {
            piece,
            size,
            root_id,
            proof_set_id: target.proof_set_id,
            provider: target.provider.owner,
        })
    }

    /// Check, then transfer unless the provider already holds the piece.
    async fn hand_off(&self, target: &StorageTarget, piece: PieceCommitment, data: Bytes) -> Result<()> {
        let provider = target.provider.owner;
        let error = |phase| {
            move |source| UploadError::Provider {
                phase,
                piece,
                provider,
                source,
            }
        };
        let size = data.len() as u64;

        let session = target
            .handle
            .check_piece(&piece, size)
            .await
            .map_err(error(UploadPhase::Check))?;

        if session == UploadSession::AlreadyHeld {
            info!(%piece, %provider, "Provider already holds piece, skipping transfer");
            metrics::counter!("tessera_upload_transfers_skipped_total").increment(1);
            return Ok(());
        }

        target
            .handle
            .put_piece(&session, data)
            .await
            .map_err(error(UploadPhase::Transfer))?;
        debug!(%piece, %provider, size, "Transferred piece");
        Ok(())
    }

    async fn wait_for_parking(&self, target: &StorageTarget, piece: PieceCommitment, size: u64) -> Result<()> {
        let provider = target.provider.owner;
        let handle = &*target.handle;
        let poll = self.config.parking;
        let started = Instant::now();

        let parked = poll_until(poll.interval, started + poll.timeout, || async move {
            match handle.find_piece(&piece, size).await {
                Ok(true) => Ok(Some(())),
                Ok(false) => {
                    debug!(%piece, %provider, "Piece not parked yet");
                    Ok(None)
                }
                Err(error) if error.is_transient() => {
                    debug!(%piece, %provider, %error, "Parking check failed, retrying");
                    Ok(None)
                }
                Err(source) => Err(UploadError::Provider {
                    phase: UploadPhase::Parking,
                    piece,
                    provider,
                    source,
                }),
            }
        })
        .await?;

        metrics::histogram!("tessera_parking_wait_seconds").record(started.elapsed().as_secs_f64());
        match parked {
            Some(()) => Ok(()),
            None => Err(UploadError::PieceParkingTimeout {
                piece,
                provider,
                timeout: poll.timeout,
            }),
        }
    }
}
