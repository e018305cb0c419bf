//! The storage client.

use bytes::Bytes;
use reqwest::Client;
use std::sync::Arc;
use tessera_directory::ProviderDirectory;
use tessera_piece::PieceCommitment;
use tessera_primitives::{Address, ProofSetSummary, ProviderInfo};
use tessera_proofset::{NoopObserver, ProofSetCoordinator, SelectionOptions, UploadObserver};
use tessera_provider::{HttpConnector, ProviderConnector};
use tessera_retrieval::{FetchOptions, PieceStream, PieceRetriever, RetrievalChain};
use tessera_signer::SigningIdentity;
use tessera_spec::NetworkSpec;
use tessera_upload::{UploadPipeline, UploadResult};
use tracing::debug;
use url::Url;

use crate::{ClientConfig, Result};

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`StorageClient`].
///
/// Only the network, directory and identity are required. Providers are
/// reached over HTTP unless another connector is supplied.
pub struct StorageClientBuilder {
    spec: NetworkSpec,
    directory: ProviderDirectory,
    identity: Arc<dyn SigningIdentity>,
    connector: Option<Arc<dyn ProviderConnector>>,
    http: Option<Client>,
    cdn_base_url: Option<Url>,
    config: ClientConfig,
}

impl StorageClientBuilder {
    /// Use `connector` to reach providers.
    pub fn connector(mut self, connector: Arc<dyn ProviderConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Share `client`'s connection pool for provider and CDN requests.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Send CDN requests to `base_url` instead of the network's CDN host.
    pub fn cdn_base_url(mut self, base_url: Url) -> Self {
        self.cdn_base_url = Some(base_url);
        self
    }

    /// Polling and size limits.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<StorageClient> {
        let http_connector = match self.http {
            Some(client) => HttpConnector::with_client(client),
            None => HttpConnector::new()?,
        };
        let http = http_connector.client().clone();
        let connector: Arc<dyn ProviderConnector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(http_connector),
        };

        let coordinator = ProofSetCoordinator::new(
            self.directory.clone(),
            connector.clone(),
            self.identity,
            self.config.proof_sets,
        );
        let uploads = UploadPipeline::new(coordinator, self.config.upload);

        let mut retrieval =
            RetrievalChain::new(&self.spec, self.directory.clone(), connector, http);
        if let Some(base_url) = self.cdn_base_url {
            retrieval = retrieval.with_cdn_base_url(base_url);
        }

        Ok(StorageClient {
            spec: self.spec,
            directory: self.directory,
            uploads,
            retrieval,
        })
    }
}

// ============================================================================
// Client
// ============================================================================

/// Stores and fetches pieces on behalf of one signing identity.
#[derive(Debug, Clone)]
pub struct StorageClient {
    spec: NetworkSpec,
    directory: ProviderDirectory,
    uploads: UploadPipeline,
    retrieval: RetrievalChain,
}

impl StorageClient {
    /// Start building a client for `identity` on `spec`.
    pub fn builder(
        spec: NetworkSpec,
        directory: ProviderDirectory,
        identity: Arc<dyn SigningIdentity>,
    ) -> StorageClientBuilder {
        StorageClientBuilder {
            spec,
            directory,
            identity,
            connector: None,
            http: None,
            cdn_base_url: None,
            config: ClientConfig::default(),
        }
    }

    /// The network the client operates on.
    pub fn spec(&self) -> &NetworkSpec {
        &self.spec
    }

    /// The address paying for storage.
    pub fn address(&self) -> Address {
        self.uploads.coordinator().client()
    }

    /// Store `data`.
    pub async fn upload(&self, data: Bytes, options: &SelectionOptions) -> Result<UploadResult> {
        self.upload_with_observer(data, options, &NoopObserver).await
    }

    /// Store `data`, reporting progress to `observer`.
    pub async fn upload_with_observer(
        &self,
        data: Bytes,
        options: &SelectionOptions,
        observer: &dyn UploadObserver,
    ) -> Result<UploadResult> {
        Ok(self.uploads.upload(data, options, observer).await?)
    }

    /// Fetch and verify `piece`.
    pub async fn download(&self, piece: &PieceCommitment, options: &FetchOptions) -> Result<Bytes> {
        debug!(%piece, with_cdn = options.with_cdn, "Downloading piece");
        Ok(self
            .retrieval
            .fetch_bytes(piece, self.address(), options)
            .await?)
    }

    /// Verified stream of `piece`.
    pub async fn download_stream(
        &self,
        piece: &PieceCommitment,
        options: &FetchOptions,
    ) -> Result<PieceStream> {
        Ok(self.retrieval.fetch(piece, self.address(), options).await?)
    }

    /// Approved providers.
    pub async fn providers(&self) -> Result<Vec<ProviderInfo>> {
        Ok(self.directory.list_approved().await?)
    }

    /// The client's proof sets.
    pub async fn proof_sets(&self) -> Result<Vec<ProofSetSummary>> {
        Ok(self.directory.proof_sets_for_client(self.address()).await?)
    }
}
