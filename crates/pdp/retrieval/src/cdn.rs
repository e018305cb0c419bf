//! CDN retrieval layer.

use async_trait::async_trait;
use futures::{StreamExt, stream};
use reqwest::{Client, StatusCode};
use tessera_piece::PieceCommitment;
use tessera_primitives::Address;
use tessera_spec::NetworkSpec;
use tracing::{debug, warn};
use url::Url;

use crate::{FetchOptions, PieceRetriever, PieceStream, Result, RetrievalError};

/// Tries the network's CDN before deferring to `inner`.
///
/// Only fetches asking for the CDN use it. Pieces are addressed by their
/// legacy CID, the form providers serve, as `https://{client}.{host}/{piece}`.
/// The CDN has served the piece only once its whole body has arrived: any
/// answer other than 200, or a body that breaks partway, falls through to
/// `inner`.
#[derive(Debug, Clone)]
pub struct CdnRetriever<R> {
    client: Client,
    host: Option<String>,
    base_url: Option<Url>,
    inner: R,
}

impl<R> CdnRetriever<R> {
    /// Wrap `inner` with the CDN of `spec`, if the network has one.
    pub fn new(client: Client, spec: &NetworkSpec, inner: R) -> Self {
        Self {
            client,
            host: spec.cdn_host().map(str::to_string),
            base_url: None,
            inner,
        }
    }

    /// Send requests to `{base_url}/{client}/{piece}` instead.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// The wrapped retriever.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Where the CDN serves `piece` for `client`.
    pub fn piece_url(&self, piece: &PieceCommitment, client: Address) -> Option<Url> {
        let url = match (&self.base_url, &self.host) {
            (Some(base), _) => format!(
                "{}/{client:#x}/{}",
                base.as_str().trim_end_matches('/'),
                piece.to_legacy_string()
            ),
            (None, Some(host)) => {
                format!("https://{client:#x}.{host}/{}", piece.to_legacy_string())
            }
            (None, None) => return None,
        };
        Url::parse(&url).ok()
    }

    async fn try_cdn(&self, url: Url) -> Option<PieceStream> {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(%url, %error, "CDN request failed, falling back to providers");
                return None;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!(%url, %status, "CDN did not serve piece, falling back to providers");
            metrics::counter!("tessera_cdn_fallbacks_total").increment(1);
            return None;
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(error) => {
                warn!(%url, %error, "CDN transfer broke, falling back to providers");
                metrics::counter!("tessera_cdn_fallbacks_total").increment(1);
                return None;
            }
        };

        metrics::counter!("tessera_retrievals_total", "source" => "cdn").increment(1);
        Some(stream::iter([Ok(body)]).boxed())
    }
}

#[async_trait]
impl<R: PieceRetriever> PieceRetriever for CdnRetriever<R> {
    async fn fetch(
        &self,
        piece: &PieceCommitment,
        client: Address,
        options: &FetchOptions,
    ) -> Result<PieceStream> {
        if options.with_cdn {
            match self.piece_url(piece, client) {
                Some(url) => {
                    debug!(%url, "Trying CDN");
                    let served = tokio::select! {
                        biased;
                        _ = options.cancel.cancelled() => return Err(RetrievalError::Cancelled),
                        served = self.try_cdn(url) => served,
                    };
                    if let Some(stream) = served {
                        return Ok(stream);
                    }
                }
                None => debug!(%piece, "Network has no CDN, skipping"),
            }
        }
        self.inner.fetch(piece, client, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect;
    use assert_matches::assert_matches;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tessera_test_utils::{payload, test_spec};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    /// Serves fixed bytes and counts calls.
    #[derive(Default)]
    struct Fallback {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl PieceRetriever for Fallback {
        async fn fetch(
            &self,
            _piece: &PieceCommitment,
            _client: Address,
            _options: &FetchOptions,
        ) -> Result<PieceStream> {
            *self.calls.lock() += 1;
            Ok(futures::stream::iter([Ok(bytes::Bytes::from_static(b"provider"))]).boxed())
        }
    }

    fn client() -> Address {
        Address::with_last_byte(0xaa)
    }

    fn piece() -> PieceCommitment {
        tessera_piece::compute(&payload(300, 1)).unwrap()
    }

    async fn cdn(server: &MockServer) -> CdnRetriever<Arc<Fallback>> {
        CdnRetriever::new(Client::new(), &test_spec(), Arc::new(Fallback::default()))
            .with_base_url(server.uri().parse().unwrap())
    }

    /// Answers 200 promising 1000 bytes, sends five and hangs up.
    async fn truncating_server() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 1000\r\n\r\nshort")
                    .await;
            }
        });
        format!("http://{addr}").parse().unwrap()
    }

    #[test]
    fn test_piece_url_uses_network_host() {
        let retriever = CdnRetriever::new(Client::new(), &test_spec(), ());
        let url = retriever.piece_url(&piece(), client()).unwrap();
        assert_eq!(
            url.as_str(),
            format!(
                "https://0x00000000000000000000000000000000000000aa.calibration.filcdn.io/{}",
                piece().to_legacy_string()
            )
        );
    }

    #[tokio::test]
    async fn test_cdn_hit_skips_inner() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{:#x}/{}", client(), piece().to_legacy_string())))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"from cdn".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        let retriever = cdn(&server).await;

        let stream = retriever
            .fetch(&piece(), client(), &FetchOptions::with_cdn())
            .await
            .unwrap();

        assert_eq!(collect(stream).await.unwrap().as_ref(), b"from cdn");
        assert_eq!(*retriever.inner().calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_payment_required_falls_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(402))
            .expect(1)
            .mount(&server)
            .await;
        let retriever = cdn(&server).await;

        let stream = retriever
            .fetch(&piece(), client(), &FetchOptions::with_cdn())
            .await
            .unwrap();

        assert_eq!(collect(stream).await.unwrap().as_ref(), b"provider");
        assert_eq!(*retriever.inner().calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_broken_cdn_body_falls_through() {
        let retriever =
            CdnRetriever::new(Client::new(), &test_spec(), Arc::new(Fallback::default()))
                .with_base_url(truncating_server().await);

        let stream = retriever
            .fetch(&piece(), client(), &FetchOptions::with_cdn())
            .await
            .unwrap();

        assert_eq!(collect(stream).await.unwrap().as_ref(), b"provider");
        assert_eq!(*retriever.inner().calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_cdn_not_asked_without_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let retriever = cdn(&server).await;

        let _ = retriever
            .fetch(&piece(), client(), &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(*retriever.inner().calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_cdn_answers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(30)),
            )
            .mount(&server)
            .await;
        let retriever = cdn(&server).await;
        let options = FetchOptions::with_cdn();
        options.cancel.cancel();

        let result = retriever.fetch(&piece(), client(), &options).await;

        assert_matches!(result.err(), Some(RetrievalError::Cancelled));
        assert_eq!(*retriever.inner().calls.lock(), 0);
    }
}
