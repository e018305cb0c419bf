//! Coordinator error types.

use std::time::Duration;
use tessera_directory::DirectoryError;
use tessera_primitives::{Address, Classify, ErrorKind, ProofSetId, TxHash};
use tessera_provider::ProviderError;
use tessera_signer::SignerError;
use thiserror::Error;

use crate::{CoordinatorState, InvalidTransition};

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, ProofSetError>;

/// Errors from proof set selection, creation and root addition.
#[derive(Debug, Error)]
pub enum ProofSetError {
    /// The registry or ledger query failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// A provider call failed.
    #[error("provider {provider}: {source}")]
    Provider {
        /// The provider called.
        provider: Address,
        /// Underlying failure.
        #[source]
        source: ProviderError,
    },

    /// Signing a request failed.
    #[error(transparent)]
    Signer(#[from] SignerError),

    /// The explicit selection contradicts itself or the ledger.
    #[error("inconsistent selection: {0}")]
    InconsistentSelection(String),

    /// The explicit proof set is not one of the caller's.
    #[error("proof set {proof_set_id} not found for client {client}")]
    ProofSetNotFound {
        /// Requested set.
        proof_set_id: ProofSetId,
        /// The caller.
        client: Address,
    },

    /// The explicit proof set exists but is not live.
    #[error("proof set {0} is not live")]
    ProofSetNotLive(ProofSetId),

    /// The requested provider is not approved.
    #[error("provider {0} not found")]
    ProviderNotFound(String),

    /// No approved provider answered.
    #[error("no approved provider available ({tried} tried)")]
    NoProviderAvailable {
        /// Providers probed.
        tried: usize,
    },

    /// A root addition was requested with nothing to add.
    #[error("no roots to add")]
    NoRoots,

    /// Proof set creation did not finish in time.
    #[error("proof set creation timed out after {timeout:?} while in {stage}")]
    ProofSetCreationTimeout {
        /// Step that was still pending.
        stage: CoordinatorState,
        /// The configured deadline.
        timeout: Duration,
    },

    /// The creation transaction was rejected.
    #[error("proof set creation {tx_hash} failed: {reason}")]
    CreationFailed {
        /// Creation transaction.
        tx_hash: TxHash,
        /// What went wrong.
        reason: String,
    },

    /// Root addition did not finish in time.
    #[error("root addition to proof set {proof_set_id} timed out after {timeout:?} while in {stage}")]
    RootAdditionTimeout {
        /// Target proof set.
        proof_set_id: ProofSetId,
        /// Step that was still pending.
        stage: CoordinatorState,
        /// The configured deadline.
        timeout: Duration,
    },

    /// The root addition transaction was rejected.
    #[error("root addition {tx_hash} to proof set {proof_set_id} failed: {reason}")]
    RootAdditionFailed {
        /// Target proof set.
        proof_set_id: ProofSetId,
        /// Addition transaction.
        tx_hash: TxHash,
        /// What went wrong.
        reason: String,
    },

    /// The task received an event out of order.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

impl ProofSetError {
    pub(crate) fn provider(provider: Address) -> impl FnOnce(ProviderError) -> Self {
        move |source| Self::Provider { provider, source }
    }
}

impl Classify for ProofSetError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Directory(e) => e.kind(),
            Self::Provider { source, .. } => source.kind(),
            Self::Signer(e) => e.kind(),
            Self::InconsistentSelection(_)
            | Self::ProofSetNotFound { .. }
            | Self::ProofSetNotLive(_)
            | Self::ProviderNotFound(_)
            | Self::NoRoots
            | Self::InvalidTransition(_) => ErrorKind::Validation,
            Self::NoProviderAvailable { .. }
            | Self::CreationFailed { .. }
            | Self::RootAdditionFailed { .. } => ErrorKind::Transient,
            Self::ProofSetCreationTimeout { .. } | Self::RootAdditionTimeout { .. } => {
                ErrorKind::Timeout
            }
        }
    }
}
