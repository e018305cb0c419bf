//! Racing retrieval across storage providers.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{StreamExt, stream};
use std::{collections::HashMap, sync::Arc};
use tessera_directory::ProviderDirectory;
use tessera_piece::PieceCommitment;
use tessera_primitives::{Address, ProviderInfo};
use tessera_provider::{PdpProvider, ProviderConnector};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    CandidateError, CandidateFailure, FetchOptions, PieceRetriever, PieceStream, Result,
    RetrievalError,
};

/// Fetches a piece from whichever candidate provider answers first.
///
/// Candidates are the explicitly requested provider, or else every provider
/// storing one of the client's live, root-bearing proof sets. Each candidate
/// confirms it holds the piece and downloads it in full in its own task; the
/// first complete download wins and the rest are aborted. A body that breaks
/// partway counts as that candidate failing.
#[derive(Clone)]
pub struct ProviderRetriever {
    directory: ProviderDirectory,
    connector: Arc<dyn ProviderConnector>,
}

impl std::fmt::Debug for ProviderRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRetriever").finish_non_exhaustive()
    }
}

impl ProviderRetriever {
    /// Create a retriever resolving candidates through `directory`.
    pub fn new(directory: ProviderDirectory, connector: Arc<dyn ProviderConnector>) -> Self {
        Self {
            directory,
            connector,
        }
    }

    /// Providers worth asking for `client`'s data, in proof set order.
    pub async fn candidates(
        &self,
        client: Address,
        provider: Option<Address>,
    ) -> Result<Vec<ProviderInfo>> {
        if let Some(address) = provider {
            let info = self
                .directory
                .resolve_by_address(address)
                .await?
                .ok_or(RetrievalError::ProviderNotFound(address))?;
            return Ok(vec![info]);
        }

        let mut payees = Vec::new();
        for set in self.directory.proof_sets_for_client(client).await? {
            if set.is_live && set.has_roots() && !payees.contains(&set.payee) {
                payees.push(set.payee);
            }
        }

        let mut candidates = Vec::with_capacity(payees.len());
        for payee in payees {
            match self.directory.resolve_by_address(payee).await? {
                Some(info) => candidates.push(info),
                None => debug!(%payee, "Skipping unapproved provider"),
            }
        }

        if candidates.is_empty() {
            return Err(RetrievalError::NoCandidates { client });
        }
        Ok(candidates)
    }

    /// Race `candidates` for `piece`.
    async fn race(
        &self,
        piece: PieceCommitment,
        candidates: Vec<ProviderInfo>,
        cancel: &CancellationToken,
    ) -> Result<PieceStream> {
        let mut attempts = JoinSet::new();
        let mut owners = HashMap::with_capacity(candidates.len());
        for info in &candidates {
            let handle = self.connector.connect(info);
            let abort = attempts.spawn(attempt(handle, piece));
            owners.insert(abort.id(), info.owner);
        }

        let mut failures = Vec::new();
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    attempts.shutdown().await;
                    return Err(RetrievalError::Cancelled);
                }
                joined = attempts.join_next_with_id() => joined,
            };
            let Some(joined) = joined else { break };

            let (provider, result) = match joined {
                Ok((id, result)) => (owners.get(&id).copied().unwrap_or_default(), result),
                Err(error) => (
                    owners.get(&error.id()).copied().unwrap_or_default(),
                    Err(CandidateError::Task(error.to_string())),
                ),
            };

            match result {
                Ok(bytes) => {
                    let losers = attempts.len();
                    attempts.shutdown().await;
                    info!(%piece, %provider, losers, "Provider won retrieval race");
                    metrics::counter!("tessera_retrievals_total", "source" => "provider")
                        .increment(1);
                    metrics::counter!("tessera_retrieval_losers_cancelled_total")
                        .increment(losers as u64);
                    return Ok(stream::iter([Ok(bytes)]).boxed());
                }
                Err(error) => {
                    warn!(%piece, %provider, %error, "Retrieval candidate failed");
                    failures.push(CandidateFailure { provider, error });
                }
            }
        }

        metrics::counter!("tessera_retrieval_failures_total").increment(1);
        Err(RetrievalError::AllCandidatesFailed { piece, failures })
    }
}

/// Check `piece` is held, then download all of it.
async fn attempt(
    handle: Arc<dyn PdpProvider>,
    piece: PieceCommitment,
) -> std::result::Result<Bytes, CandidateError> {
    let size = piece.payload_size().unwrap_or_default();
    if !handle.find_piece(&piece, size).await? {
        return Err(CandidateError::NotHeld);
    }

    let mut body = handle.download_piece(&piece).await?;
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

#[async_trait]
impl PieceRetriever for ProviderRetriever {
    async fn fetch(
        &self,
        piece: &PieceCommitment,
        client: Address,
        options: &FetchOptions,
    ) -> Result<PieceStream> {
        let candidates = self.candidates(client, options.provider_address).await?;
        debug!(%piece, candidates = candidates.len(), "Racing providers");
        self.race(*piece, candidates, &options.cancel).await
    }
}
