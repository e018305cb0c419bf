//! The default retrieval chain.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::sync::Arc;
use tessera_directory::ProviderDirectory;
use tessera_piece::PieceCommitment;
use tessera_primitives::Address;
use tessera_provider::ProviderConnector;
use tessera_spec::NetworkSpec;
use url::Url;

use crate::{
    CdnRetriever, FetchOptions, PieceRetriever, PieceStream, ProviderRetriever, Result,
    VerifyingRetriever, collect,
};

/// CDN, then racing providers, with every result verified.
#[derive(Debug, Clone)]
pub struct RetrievalChain {
    retriever: VerifyingRetriever<CdnRetriever<ProviderRetriever>>,
}

impl RetrievalChain {
    /// Build the chain for `spec`. CDN requests share `http`'s pool.
    pub fn new(
        spec: &NetworkSpec,
        directory: ProviderDirectory,
        connector: Arc<dyn ProviderConnector>,
        http: Client,
    ) -> Self {
        let providers = ProviderRetriever::new(directory, connector);
        Self {
            retriever: VerifyingRetriever::new(CdnRetriever::new(http, spec, providers)),
        }
    }

    /// Point the CDN layer at `base_url`.
    pub fn with_cdn_base_url(self, base_url: Url) -> Self {
        let cdn = self.retriever.inner().clone().with_base_url(base_url);
        Self {
            retriever: VerifyingRetriever::new(cdn),
        }
    }

    /// Fetch and verify `piece`, returning all of its bytes.
    pub async fn fetch_bytes(
        &self,
        piece: &PieceCommitment,
        client: Address,
        options: &FetchOptions,
    ) -> Result<Bytes> {
        collect(self.fetch(piece, client, options).await?).await
    }
}

#[async_trait]
impl PieceRetriever for RetrievalChain {
    async fn fetch(
        &self,
        piece: &PieceCommitment,
        client: Address,
        options: &FetchOptions,
    ) -> Result<PieceStream> {
        self.retriever.fetch(piece, client, options).await
    }
}
