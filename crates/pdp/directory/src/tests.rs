//! Tests for the provider directory.

use super::*;
use assert_matches::assert_matches;
use tessera_primitives::{Address, ProviderInfo, RootData, TxHash, TxStatus};

const SERVICE: Address = Address::repeat_byte(0x5e);
const CLIENT: Address = Address::repeat_byte(0xc1);

fn provider(id: u64) -> ProviderInfo {
    ProviderInfo {
        id,
        owner: Address::with_last_byte(id as u8),
        pdp_url: format!("https://sp{id}.example/").parse().unwrap(),
        retrieval_url: format!("https://sp{id}.example/").parse().unwrap(),
        registered_at: 100,
        approved_at: 110,
    }
}

fn root(len: usize) -> RootData {
    let data = vec![1u8; len];
    RootData {
        piece: tessera_piece::compute(&data).unwrap(),
        raw_size: len as u64,
    }
}

fn setup() -> (InMemoryLedger, ProviderDirectory) {
    let ledger = InMemoryLedger::new(SERVICE);
    ledger.add_provider(provider(1));
    ledger.add_provider(provider(2));
    let directory = ProviderDirectory::new(ledger.clone(), ledger.clone());
    (ledger, directory)
}

#[tokio::test]
async fn test_list_and_resolve() {
    let (ledger, directory) = setup();

    let approved = directory.list_approved().await.unwrap();
    assert_eq!(approved.len(), 2);

    let found = directory
        .resolve_by_address(Address::with_last_byte(2))
        .await
        .unwrap();
    assert_eq!(found, Some(provider(2)));

    // Unknown providers are a normal result, not an error.
    assert_eq!(
        directory
            .resolve_by_address(Address::with_last_byte(9))
            .await
            .unwrap(),
        None
    );
    assert_eq!(directory.resolve_by_id(0).await.unwrap(), None);

    // Removed providers no longer resolve.
    ledger.remove_provider(2);
    assert_eq!(directory.resolve_by_id(2).await.unwrap(), None);
}

#[tokio::test]
async fn test_proof_sets_for_client() {
    let (ledger, directory) = setup();

    let live = ledger.create_proof_set(CLIENT, provider(1).owner, 0, true);
    ledger.mark_live(live.pdp_proof_set_id);
    ledger.add_roots(live.pdp_proof_set_id, &[root(100), root(200)]);

    let pending = ledger.create_proof_set(CLIENT, provider(2).owner, 1, false);

    let foreign = ledger.create_proof_set(CLIENT, provider(2).owner, 2, false);
    ledger.mark_live(foreign.pdp_proof_set_id);
    ledger.set_listener(foreign.pdp_proof_set_id, Address::repeat_byte(0xee));

    // Someone else's set is not listed.
    ledger.create_proof_set(Address::repeat_byte(0x99), provider(1).owner, 0, false);

    let sets = directory.proof_sets_for_client(CLIENT).await.unwrap();
    assert_eq!(sets.len(), 3);

    let live = sets
        .iter()
        .find(|s| s.pdp_proof_set_id == live.pdp_proof_set_id)
        .unwrap();
    assert!(live.is_live && live.is_managed && live.with_cdn);
    assert_eq!(live.root_count, 2);
    assert_eq!(live.next_root_id, 2);

    let pending = sets
        .iter()
        .find(|s| s.pdp_proof_set_id == pending.pdp_proof_set_id)
        .unwrap();
    assert!(!pending.is_live);
    assert_eq!(pending.root_count, 0);

    let foreign = sets
        .iter()
        .find(|s| s.pdp_proof_set_id == foreign.pdp_proof_set_id)
        .unwrap();
    assert!(foreign.is_live);
    assert!(!foreign.is_managed);

    assert_eq!(directory.next_client_dataset_id(CLIENT).await.unwrap(), 3);
}

#[tokio::test]
async fn test_unavailable_is_transient() {
    let (ledger, directory) = setup();
    ledger.set_unavailable(true);

    let err = directory.list_approved().await.unwrap_err();
    assert!(err.is_transient());
    assert_matches!(
        err,
        DirectoryError::Unavailable {
            operation: "approved_provider_ids",
            ..
        }
    );

    ledger.set_unavailable(false);
    assert!(directory.list_approved().await.is_ok());
}

#[tokio::test]
async fn test_transaction_status() {
    let (ledger, directory) = setup();
    let tx = TxHash::repeat_byte(1);

    assert_eq!(directory.transaction_status(tx).await.unwrap(), None);
    ledger.set_transaction(tx, TxStatus::Pending);
    assert_eq!(
        directory.transaction_status(tx).await.unwrap(),
        Some(TxStatus::Pending)
    );
    ledger.set_transaction(tx, TxStatus::Confirmed);
    assert_eq!(
        directory.transaction_status(tx).await.unwrap(),
        Some(TxStatus::Confirmed)
    );
}

#[test]
fn test_snapshot_toml_roundtrip() {
    let (ledger, _) = setup();
    let set = ledger.create_proof_set(CLIENT, provider(1).owner, 0, true);
    ledger.mark_live(set.pdp_proof_set_id);
    ledger.add_roots(set.pdp_proof_set_id, &[root(300)]);
    ledger.set_transaction(TxHash::repeat_byte(7), TxStatus::Rejected);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.toml");
    ledger.save(&path).unwrap();

    let loaded = InMemoryLedger::load(&path).unwrap();
    assert_eq!(loaded.snapshot(), ledger.snapshot());
}
