//! Tests for the HTTP provider client.

use super::*;
use assert_matches::assert_matches;
use bytes::Bytes;
use futures::TryStreamExt;
use serde_json::json;
use tessera_piece::PieceCommitment;
use tessera_primitives::{Address, ProviderInfo, RootData, TxHash, TxStatus};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

fn provider(server: &MockServer) -> HttpProvider {
    let info = ProviderInfo {
        id: 1,
        owner: Address::with_last_byte(1),
        pdp_url: server.uri().parse().unwrap(),
        retrieval_url: server.uri().parse().unwrap(),
        registered_at: 0,
        approved_at: 0,
    };
    HttpProvider::new(reqwest::Client::new(), info)
}

fn piece() -> (PieceCommitment, Vec<u8>) {
    let data: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
    (tessera_piece::compute(&data).unwrap(), data)
}

#[tokio::test]
async fn test_ping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pdp/ping"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server).ping().await.unwrap();
}

#[tokio::test]
async fn test_ping_failure_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pdp/ping"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = provider(&server).ping().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_matches!(err, ProviderError::Http { operation: "ping", ref body, .. } if body == "maintenance");
}

#[tokio::test]
async fn test_error_body_truncated_on_char_boundary() {
    let server = MockServer::start().await;
    let body = format!("{}é and more", "a".repeat(511));
    Mock::given(method("GET"))
        .and(path("/pdp/ping"))
        .respond_with(ResponseTemplate::new(500).set_body_string(body))
        .mount(&server)
        .await;

    let err = provider(&server).ping().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_matches!(err, ProviderError::Http { ref body, .. } if *body == "a".repeat(511));
}

#[tokio::test]
async fn test_find_piece() {
    let server = MockServer::start().await;
    let (piece, data) = piece();
    let check = piece_check(&piece, data.len() as u64);

    Mock::given(method("GET"))
        .and(path("/pdp/piece"))
        .and(query_param("name", "sha2-256-trunc254-padded"))
        .and(query_param("hash", check.hash.as_str()))
        .and(query_param("size", "1000"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "pieceCid": piece.to_legacy_string() })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pdp/piece"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider = provider(&server);
    assert!(provider.find_piece(&piece, 1000).await.unwrap());
    assert!(!provider.find_piece(&piece, 1000).await.unwrap());
}

#[tokio::test]
async fn test_check_and_put_piece() {
    let server = MockServer::start().await;
    let (piece, data) = piece();
    let check = piece_check(&piece, data.len() as u64);

    Mock::given(method("POST"))
        .and(path("/pdp/piece"))
        .and(body_json(json!({ "check": check })))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Location", "/pdp/piece/upload/abc123"),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/pdp/piece/upload/abc123"))
        .and(header("content-type", "application/octet-stream"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let session = provider.check_piece(&piece, 1000).await.unwrap();
    assert_matches!(&session, UploadSession::Open { upload_url } if upload_url.path() == "/pdp/piece/upload/abc123");

    provider.put_piece(&session, Bytes::from(data)).await.unwrap();
}

#[tokio::test]
async fn test_check_piece_already_held() {
    let server = MockServer::start().await;
    let (piece, _) = piece();

    Mock::given(method("POST"))
        .and(path("/pdp/piece"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pieceCid": piece.to_legacy_string() })))
        .mount(&server)
        .await;

    let session = provider(&server).check_piece(&piece, 1000).await.unwrap();
    assert_eq!(session, UploadSession::AlreadyHeld);
}

#[tokio::test]
async fn test_download_piece() {
    let server = MockServer::start().await;
    let (piece, data) = piece();

    Mock::given(method("GET"))
        .and(path(format!("/piece/{}", piece.to_legacy_string())))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(data.clone()))
        .mount(&server)
        .await;

    let stream = provider(&server).download_piece(&piece).await.unwrap();
    let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
    assert_eq!(chunks.concat(), data);
}

#[tokio::test]
async fn test_download_missing_piece() {
    let server = MockServer::start().await;
    let (piece, _) = piece();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = provider(&server).download_piece(&piece).await;
    assert_matches!(result.err(), Some(ProviderError::PieceNotFound(_)));
}

#[tokio::test]
async fn test_create_proof_set_and_status() {
    let server = MockServer::start().await;
    let tx = TxHash::repeat_byte(0xab);
    let request = CreateProofSetRequest {
        record_keeper: Address::repeat_byte(0x5e),
        extra_data: "0x1234".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/pdp/proof-sets"))
        .and(body_json(json!({
            "recordKeeper": Address::repeat_byte(0x5e),
            "extraData": "0x1234",
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", format!("/pdp/proof-sets/created/{tx}").as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/pdp/proof-sets/created/{tx}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "createMessageHash": tx,
            "proofsetCreated": true,
            "service": "tessera",
            "txStatus": "confirmed",
            "ok": true,
            "proofSetId": 42,
        })))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let created = provider.create_proof_set(&request).await.unwrap();
    assert_eq!(created, tx);

    let status = provider.creation_status(tx).await.unwrap();
    assert!(status.proof_set_created);
    assert_eq!(status.tx_status, TxStatus::Confirmed);
    assert_eq!(status.proof_set_id, Some(42));
    assert!(!status.is_failed());
}

#[tokio::test]
async fn test_add_roots_modern_and_legacy() {
    let server = MockServer::start().await;
    let (piece, data) = piece();
    let tx = TxHash::repeat_byte(0xcd);
    let request = AddRootsRequest::new(
        &[RootData {
            piece,
            raw_size: data.len() as u64,
        }],
        "0xbeef".to_string(),
    );

    Mock::given(method("POST"))
        .and(path("/pdp/proof-sets/7/roots"))
        .and(body_json(json!({
            "roots": [{
                "rootCid": piece.to_legacy_string(),
                "subroots": [{ "subrootCid": piece.to_legacy_string() }],
            }],
            "extraData": "0xbeef",
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", format!("/pdp/proof-sets/7/roots/added/{tx}").as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/pdp/proof-sets/8/roots"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/pdp/proof-sets/7/roots/added/{tx}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "txHash": tx,
            "txStatus": "confirmed",
            "proofSetId": 7,
            "rootCount": 1,
            "addMessageOk": true,
            "confirmedRootIds": [3],
        })))
        .mount(&server)
        .await;

    let provider = provider(&server);
    assert_eq!(
        provider.add_roots(7, &request).await.unwrap(),
        RootSubmission::Submitted { tx_hash: tx }
    );
    assert_eq!(
        provider.add_roots(8, &request).await.unwrap(),
        RootSubmission::Legacy
    );

    let status = provider.root_addition_status(7, tx).await.unwrap();
    assert_eq!(status.confirmed_root_ids, Some(vec![3]));
    assert!(!status.is_failed());
}

#[tokio::test]
async fn test_invalid_json_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pdp/proof-sets/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    assert_matches!(
        provider(&server).proof_set(1).await,
        Err(ProviderError::InvalidResponse { operation: "proof_set", .. })
    );
}

#[test]
fn test_connector_shares_identity() {
    let connector = HttpConnector::new().unwrap();
    let info = ProviderInfo {
        id: 5,
        owner: Address::with_last_byte(5),
        pdp_url: "https://sp.example/api/".parse().unwrap(),
        retrieval_url: "https://sp.example/".parse().unwrap(),
        registered_at: 0,
        approved_at: 0,
    };
    assert_eq!(connector.connect(&info).owner(), info.owner);

    // Endpoint joining keeps a base path prefix.
    let url = http::endpoint(&info.pdp_url, "pdp/ping").unwrap();
    assert_eq!(url.as_str(), "https://sp.example/api/pdp/ping");
}
