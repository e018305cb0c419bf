//! Retrieval error types.

use std::fmt::Write;
use tessera_directory::DirectoryError;
use tessera_piece::{PieceCommitment, PieceError};
use tessera_primitives::{Address, Classify, ErrorKind};
use tessera_provider::ProviderError;
use thiserror::Error;

/// Result type for retrievals.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Why a single provider could not serve a piece.
#[derive(Debug, Error)]
pub enum CandidateError {
    /// The provider does not report the piece as parked.
    #[error("piece not held")]
    NotHeld,

    /// A provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The attempt's task ended without a result.
    #[error("attempt aborted: {0}")]
    Task(String),
}

/// A candidate that lost the race by failing.
#[derive(Debug)]
pub struct CandidateFailure {
    /// The provider tried.
    pub provider: Address,
    /// What went wrong.
    pub error: CandidateError,
}

fn summarize(failures: &[CandidateFailure]) -> String {
    let mut out = String::new();
    for (i, failure) in failures.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{}: {}", failure.provider, failure.error);
    }
    out
}

/// Errors from fetching a piece.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The registry or ledger query failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The explicitly requested provider is not approved.
    #[error("provider {0} not found")]
    ProviderNotFound(Address),

    /// The client has no live proof set holding data.
    #[error("no provider holds data for client {client}")]
    NoCandidates {
        /// The client whose proof sets were searched.
        client: Address,
    },

    /// Every candidate provider failed.
    #[error("all {} candidates failed for {piece}: {}", .failures.len(), summarize(.failures))]
    AllCandidatesFailed {
        /// The requested piece.
        piece: PieceCommitment,
        /// One entry per candidate.
        failures: Vec<CandidateFailure>,
    },

    /// The served bytes do not hash to the requested commitment.
    #[error("integrity check failed for {piece}: {source}")]
    Integrity {
        /// The requested piece.
        piece: PieceCommitment,
        /// The verification failure.
        #[source]
        source: PieceError,
    },

    /// The caller cancelled the fetch.
    #[error("retrieval cancelled")]
    Cancelled,
}

impl Classify for RetrievalError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Directory(e) => e.kind(),
            Self::ProviderNotFound(_) | Self::NoCandidates { .. } => ErrorKind::Validation,
            Self::AllCandidatesFailed { .. } => ErrorKind::Aggregate,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}
