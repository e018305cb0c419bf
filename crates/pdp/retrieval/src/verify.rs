//! Integrity verification layer.

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tessera_piece::PieceCommitment;
use tessera_primitives::Address;
use tracing::{debug, error};

use crate::{
    FetchOptions, PieceRetriever, PieceStream, Result, RetrievalError, cancellable, collect,
};

/// Checks whatever `inner` serves against the requested commitment.
///
/// The whole piece is buffered before anything is returned, so callers never
/// see bytes that fail verification.
#[derive(Debug, Clone)]
pub struct VerifyingRetriever<R> {
    inner: R,
}

impl<R> VerifyingRetriever<R> {
    /// Wrap `inner`.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// The wrapped retriever.
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: PieceRetriever> PieceRetriever for VerifyingRetriever<R> {
    async fn fetch(
        &self,
        piece: &PieceCommitment,
        client: Address,
        options: &FetchOptions,
    ) -> Result<PieceStream> {
        let stream = self.inner.fetch(piece, client, options).await?;
        let data = collect(cancellable(stream, options.cancel.clone())).await?;

        if let Err(source) = tessera_piece::verify(piece, &data) {
            error!(%piece, len = data.len(), %source, "Retrieved bytes failed verification");
            metrics::counter!("tessera_integrity_failures_total").increment(1);
            return Err(RetrievalError::Integrity {
                piece: *piece,
                source,
            });
        }

        debug!(%piece, len = data.len(), "Verified piece");
        Ok(stream::once(async move { Ok(data) }).boxed())
    }
}
