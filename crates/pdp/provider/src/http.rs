//! HTTP client for the provider PDP API.

use alloy_primitives::hex;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use tessera_piece::{PieceCommitment, constants::LEGACY_HASH_NAME};
use tessera_primitives::{Address, ProofSetId, ProviderInfo, TxHash};
use tracing::{debug, trace};
use url::Url;

use crate::{
    AddRootsRequest, ByteStream, CreateProofSetRequest, CreationStatus, PdpProvider, PieceCheck,
    ProofSetDetails, ProviderConnector, ProviderError, Result, RootAdditionStatus,
    RootSubmission, UploadSession,
    types::{CheckRequest, FoundPiece},
};

/// Longest response body kept in error messages.
const MAX_ERROR_BODY: usize = 512;

/// Default connect timeout for provider requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on control requests. Piece transfers are bounded by their callers.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Piece identification sent to providers.
pub fn piece_check(piece: &PieceCommitment, size: u64) -> PieceCheck {
    PieceCheck {
        name: LEGACY_HASH_NAME.to_string(),
        hash: hex::encode(piece.legacy_digest()),
        size,
    }
}

/// Append `path` to `base`, keeping any path prefix `base` already has.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&joined)?)
}

/// Resolve a `Location` header, absolute or relative to `base`.
fn location(operation: &'static str, base: &Url, response: &Response) -> Result<Option<Url>> {
    let Some(value) = response.headers().get(header::LOCATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|e| ProviderError::invalid(operation, format!("location header: {e}")))?;

    Ok(Some(base.join(value)?))
}

/// Transaction hash at the end of a `Location` path.
fn location_tx_hash(operation: &'static str, url: &Url) -> Result<TxHash> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .ok_or_else(|| ProviderError::invalid(operation, "location has no path"))?
        .parse()
        .map_err(|e| ProviderError::invalid(operation, format!("location tx hash: {e}")))
}

/// Cut `text` to at most `max` bytes without splitting a character.
fn truncate_on_char_boundary(text: &mut String, max: usize) {
    let mut end = max.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

/// Turn non-success responses into [`ProviderError::Http`].
async fn ensure_success(operation: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    truncate_on_char_boundary(&mut body, MAX_ERROR_BODY);
    Err(ProviderError::Http {
        operation,
        status: status.as_u16(),
        body,
    })
}

async fn json<T: DeserializeOwned>(operation: &'static str, response: Response) -> Result<T> {
    let response = ensure_success(operation, response).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(ProviderError::transport(operation))?;
    serde_json::from_slice(&bytes).map_err(|e| ProviderError::invalid(operation, e))
}

/// A provider reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpProvider {
    client: Client,
    info: ProviderInfo,
}

impl HttpProvider {
    /// Create a handle sharing `client`'s connection pool.
    pub fn new(client: Client, info: ProviderInfo) -> Self {
        Self { client, info }
    }

    /// The provider's registry record.
    pub fn info(&self) -> &ProviderInfo {
        &self.info
    }

    fn pdp(&self, path: &str) -> Result<Url> {
        endpoint(&self.info.pdp_url, path)
    }
}

#[async_trait]
impl PdpProvider for HttpProvider {
    fn owner(&self) -> Address {
        self.info.owner
    }

    async fn ping(&self) -> Result<()> {
        const OP: &str = "ping";
        let response = self
            .client
            .get(self.pdp("pdp/ping")?)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(ProviderError::transport(OP))?;
        ensure_success(OP, response).await?;
        Ok(())
    }

    async fn find_piece(&self, piece: &PieceCommitment, size: u64) -> Result<bool> {
        const OP: &str = "find_piece";
        let check = piece_check(piece, size);
        let size = check.size.to_string();
        let response = self
            .client
            .get(self.pdp("pdp/piece")?)
            .query(&[
                ("name", check.name.as_str()),
                ("hash", check.hash.as_str()),
                ("size", size.as_str()),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(ProviderError::transport(OP))?;

        if response.status() == StatusCode::NOT_FOUND {
            trace!(%piece, provider = %self.info.owner, "Piece not parked yet");
            return Ok(false);
        }

        let found: FoundPiece = json(OP, response).await?;
        let found_piece: PieceCommitment = found
            .piece_cid
            .parse()
            .map_err(|e| ProviderError::invalid(OP, e))?;
        if !found_piece.matches(piece) {
            return Err(ProviderError::invalid(
                OP,
                format!("provider reported {found_piece} for {piece}"),
            ));
        }
        Ok(true)
    }

    async fn check_piece(&self, piece: &PieceCommitment, size: u64) -> Result<UploadSession> {
        const OP: &str = "check_piece";
        let check = piece_check(piece, size);
        let response = self
            .client
            .post(self.pdp("pdp/piece")?)
            .json(&CheckRequest { check: &check })
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(ProviderError::transport(OP))?;

        match response.status() {
            StatusCode::OK => {
                debug!(%piece, provider = %self.info.owner, "Provider already holds piece");
                Ok(UploadSession::AlreadyHeld)
            }
            StatusCode::CREATED => {
                let upload_url = location(OP, &self.info.pdp_url, &response)?
                    .ok_or_else(|| ProviderError::invalid(OP, "missing upload location"))?;
                Ok(UploadSession::Open { upload_url })
            }
            _ => {
                ensure_success(OP, response).await?;
                Err(ProviderError::invalid(OP, "unexpected success status"))
            }
        }
    }

    async fn put_piece(&self, session: &UploadSession, data: Bytes) -> Result<()> {
        const OP: &str = "put_piece";
        let UploadSession::Open { upload_url } = session else {
            return Ok(());
        };

        let response = self
            .client
            .put(upload_url.clone())
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(ProviderError::transport(OP))?;
        ensure_success(OP, response).await?;
        Ok(())
    }

    async fn download_piece(&self, piece: &PieceCommitment) -> Result<ByteStream> {
        const OP: &str = "download_piece";
        let url = endpoint(
            &self.info.retrieval_url,
            &format!("piece/{}", piece.to_legacy_string()),
        )?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ProviderError::transport(OP))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::PieceNotFound(piece.to_string()));
        }
        let response = ensure_success(OP, response).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ProviderError::transport(OP)))
            .boxed())
    }

    async fn create_proof_set(&self, request: &CreateProofSetRequest) -> Result<TxHash> {
        const OP: &str = "create_proof_set";
        let response = self
            .client
            .post(self.pdp("pdp/proof-sets")?)
            .json(request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(ProviderError::transport(OP))?;
        let response = ensure_success(OP, response).await?;

        let status_url = location(OP, &self.info.pdp_url, &response)?
            .ok_or_else(|| ProviderError::invalid(OP, "missing status location"))?;
        location_tx_hash(OP, &status_url)
    }

    async fn creation_status(&self, tx: TxHash) -> Result<CreationStatus> {
        const OP: &str = "creation_status";
        let response = self
            .client
            .get(self.pdp(&format!("pdp/proof-sets/created/{tx}"))?)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(ProviderError::transport(OP))?;
        json(OP, response).await
    }

    async fn proof_set(&self, id: ProofSetId) -> Result<ProofSetDetails> {
        const OP: &str = "proof_set";
        let response = self
            .client
            .get(self.pdp(&format!("pdp/proof-sets/{id}"))?)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(ProviderError::transport(OP))?;
        json(OP, response).await
    }

    async fn add_roots(&self, id: ProofSetId, request: &AddRootsRequest) -> Result<RootSubmission> {
        const OP: &str = "add_roots";
        let response = self
            .client
            .post(self.pdp(&format!("pdp/proof-sets/{id}/roots"))?)
            .json(request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(ProviderError::transport(OP))?;
        let response = ensure_success(OP, response).await?;

        match location(OP, &self.info.pdp_url, &response)? {
            Some(url) => Ok(RootSubmission::Submitted {
                tx_hash: location_tx_hash(OP, &url)?,
            }),
            None => Ok(RootSubmission::Legacy),
        }
    }

    async fn root_addition_status(&self, id: ProofSetId, tx: TxHash) -> Result<RootAdditionStatus> {
        const OP: &str = "root_addition_status";
        let response = self
            .client
            .get(self.pdp(&format!("pdp/proof-sets/{id}/roots/added/{tx}"))?)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(ProviderError::transport(OP))?;
        json(OP, response).await
    }
}

/// Builds [`HttpProvider`] handles sharing one connection pool.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    client: Client,
}

impl HttpConnector {
    /// Create a connector with a fresh client.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(ProviderError::transport("client"))?;
        Ok(Self { client })
    }

    /// Create a connector around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// The shared client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl ProviderConnector for HttpConnector {
    fn connect(&self, info: &ProviderInfo) -> Arc<dyn PdpProvider> {
        Arc::new(HttpProvider::new(self.client.clone(), info.clone()))
    }
}
