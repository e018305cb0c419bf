//! The retrieval capability.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use tessera_piece::PieceCommitment;
use tessera_primitives::Address;
use tokio_util::sync::CancellationToken;

use crate::{Result, RetrievalError};

/// Piece bytes as they arrive.
pub type PieceStream = BoxStream<'static, Result<Bytes>>;

/// Per-fetch options.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Fetch from this provider only.
    pub provider_address: Option<Address>,
    /// Try the CDN first.
    pub with_cdn: bool,
    /// Cancels the fetch, including any stream already returned.
    pub cancel: CancellationToken,
}

impl FetchOptions {
    /// Options fetching from `provider` only.
    pub fn from_provider(provider: Address) -> Self {
        Self {
            provider_address: Some(provider),
            ..Self::default()
        }
    }

    /// Options trying the CDN first.
    pub fn with_cdn() -> Self {
        Self {
            with_cdn: true,
            ..Self::default()
        }
    }
}

/// A source of piece bytes.
///
/// Layers wrap one another: each either serves the piece itself or defers to
/// the retriever it wraps.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait PieceRetriever: Send + Sync {
    /// Stream `piece`, stored on behalf of `client`.
    async fn fetch(
        &self,
        piece: &PieceCommitment,
        client: Address,
        options: &FetchOptions,
    ) -> Result<PieceStream>;
}

/// Make `stream` end with [`RetrievalError::Cancelled`] once `cancel` fires.
pub fn cancellable(stream: PieceStream, cancel: CancellationToken) -> PieceStream {
    stream::unfold(Some((stream, cancel)), |state| async move {
        let (mut stream, cancel) = state?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Some((Err(RetrievalError::Cancelled), None)),
            item = stream.next() => item.map(|item| (item, Some((stream, cancel)))),
        }
    })
    .boxed()
}

/// Read `stream` to the end.
pub async fn collect(mut stream: PieceStream) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}
