//! Coordinator tests against scripted providers.

use super::*;
use assert_matches::assert_matches;
use parking_lot::Mutex;
use std::sync::Arc;
use tessera_piece::PieceCommitment;
use tessera_primitives::{
    Address, Classify, ErrorKind, ProviderInfo, RootData, RootId, TxHash,
};
use tessera_provider::{CreationStatus, RootSubmission};
use tessera_signer::{LocalIdentity, SigningIdentity};
use tessera_test_utils::{MockNetwork, live_proof_set, ops, payload, test_identity};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl UploadObserver for Recorder {
    fn provider_selected(&self, provider: &ProviderInfo) {
        self.push(format!("provider:{}", provider.id));
    }
    fn proof_set_resolved(&self, target: &StorageTarget) {
        self.push(format!("resolved:{}:{}", target.proof_set_id, target.created));
    }
    fn creation_started(&self, _tx_hash: TxHash) {
        self.push("creation_started".to_string());
    }
    fn creation_progress(&self, status: &CreationStatus) {
        self.push(format!("creation_progress:{}", status.proof_set_created));
    }
    fn roots_added(&self, submission: &RootSubmission) {
        let kind = match submission {
            RootSubmission::Legacy => "legacy",
            RootSubmission::Submitted { .. } => "submitted",
        };
        self.push(format!("roots_added:{kind}"));
    }
    fn roots_confirmed(&self, root_ids: &[RootId]) {
        self.push(format!("roots_confirmed:{root_ids:?}"));
    }
}

fn coordinator(network: &MockNetwork, identity: &LocalIdentity) -> ProofSetCoordinator {
    ProofSetCoordinator::new(
        network.directory(),
        network.shared_connector(),
        Arc::new(identity.clone()),
        CoordinatorConfig::default(),
    )
}

fn root(seed: u8) -> RootData {
    let data = payload(1000, seed);
    RootData {
        piece: tessera_piece::compute(&data).unwrap(),
        raw_size: data.len() as u64,
    }
}

fn piece(seed: u8) -> (PieceCommitment, u64) {
    let root = root(seed);
    (root.piece, root.raw_size)
}

#[tokio::test(start_paused = true)]
async fn test_creates_proof_set_when_none_exists() {
    let network = MockNetwork::new(1);
    let identity = test_identity();
    let coordinator = coordinator(&network, &identity);
    let recorder = Recorder::default();
    let mut task = UploadTask::new();

    let target = coordinator
        .prepare(&mut task, &SelectionOptions::default(), &recorder)
        .await
        .unwrap();

    assert!(target.created);
    assert_eq!(target.provider.id, 1);
    assert_eq!(task.state(), CoordinatorState::Ready);
    assert_eq!(
        task.history(),
        &[
            CoordinatorState::Resolving,
            CoordinatorState::CreatingNew,
            CoordinatorState::WaitingForCreateTx,
            CoordinatorState::WaitingForCreateConfirm,
            CoordinatorState::WaitingForLive,
            CoordinatorState::Ready,
        ]
    );

    let set = network.ledger.proof_set(target.proof_set_id).unwrap();
    assert!(set.is_live);
    assert_eq!(set.record.payer, identity.address());
    assert_eq!(set.record.payee, network.provider(1).info().owner);
    assert_eq!(network.provider(1).calls(ops::PING), 1);

    assert_eq!(
        recorder.events(),
        vec![
            "provider:1".to_string(),
            "creation_started".to_string(),
            "creation_progress:true".to_string(),
            format!("resolved:{}:true", target.proof_set_id),
        ]
    );
}

#[tokio::test]
async fn test_reuses_root_bearing_proof_set() {
    let network = MockNetwork::new(2);
    let identity = test_identity();
    let client = identity.address();
    let p1 = network.provider(1).info().owner;
    let p2 = network.provider(2).info().owner;
    network.ledger.insert_proof_set(live_proof_set(10, client, p1, false, &[]));
    network
        .ledger
        .insert_proof_set(live_proof_set(11, client, p2, false, &[piece(1)]));
    network
        .ledger
        .insert_proof_set(live_proof_set(12, client, p1, true, &[piece(2)]));

    let coordinator = coordinator(&network, &identity);
    let mut task = UploadTask::new();
    let target = coordinator
        .prepare(&mut task, &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap();

    assert_eq!(target.proof_set_id, 11);
    assert_eq!(target.provider.owner, p2);
    assert!(!target.created);
    assert_eq!(
        task.history(),
        &[CoordinatorState::Resolving, CoordinatorState::ExistingFound, CoordinatorState::Ready]
    );

    // CDN uploads only consider CDN-enabled sets.
    let options = SelectionOptions {
        with_cdn: true,
        ..Default::default()
    };
    let target = coordinator
        .prepare(&mut UploadTask::new(), &options, &NoopObserver)
        .await
        .unwrap();
    assert_eq!(target.proof_set_id, 12);
}

#[tokio::test]
async fn test_ignores_sets_of_other_services() {
    let network = MockNetwork::new(1);
    let identity = test_identity();
    let p1 = network.provider(1).info().owner;
    network
        .ledger
        .insert_proof_set(live_proof_set(3, identity.address(), p1, false, &[piece(1)]));
    network.ledger.set_listener(3, Address::repeat_byte(0xee));

    let target = coordinator(&network, &identity)
        .prepare(&mut UploadTask::new(), &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert!(target.created);
    assert_ne!(target.proof_set_id, 3);
}

#[tokio::test]
async fn test_explicit_proof_set_of_other_provider_is_inconsistent() {
    let network = MockNetwork::new(2);
    let identity = test_identity();
    let p1 = network.provider(1).info().owner;
    let p2 = network.provider(2).info().owner;
    network
        .ledger
        .insert_proof_set(live_proof_set(7, identity.address(), p1, false, &[]));

    let coordinator = coordinator(&network, &identity);
    let options = SelectionOptions {
        proof_set_id: Some(7),
        provider_address: Some(p2),
        ..Default::default()
    };
    let mut task = UploadTask::new();
    let err = coordinator
        .prepare(&mut task, &options, &NoopObserver)
        .await
        .unwrap_err();
    assert_matches!(err, ProofSetError::InconsistentSelection(_));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(task.state(), CoordinatorState::Resolving);

    let options = SelectionOptions {
        proof_set_id: Some(7),
        provider_id: Some(2),
        ..Default::default()
    };
    assert_matches!(
        coordinator.prepare(&mut UploadTask::new(), &options, &NoopObserver).await,
        Err(ProofSetError::InconsistentSelection(_))
    );

    let options = SelectionOptions {
        proof_set_id: Some(7),
        provider_address: Some(p1),
        ..Default::default()
    };
    let target = coordinator
        .prepare(&mut UploadTask::new(), &options, &NoopObserver)
        .await
        .unwrap();
    assert_eq!(target.proof_set_id, 7);
}

#[tokio::test]
async fn test_explicit_proof_set_must_exist_and_be_live() {
    let network = MockNetwork::new(1);
    let identity = test_identity();
    let other_client = Address::repeat_byte(0x99);
    let p1 = network.provider(1).info().owner;

    let mut pending = live_proof_set(4, identity.address(), p1, false, &[]);
    pending.is_live = false;
    network.ledger.insert_proof_set(pending);
    network
        .ledger
        .insert_proof_set(live_proof_set(5, other_client, p1, false, &[]));

    let coordinator = coordinator(&network, &identity);
    let select = |id| SelectionOptions {
        proof_set_id: Some(id),
        ..Default::default()
    };

    assert_matches!(
        coordinator.prepare(&mut UploadTask::new(), &select(4), &NoopObserver).await,
        Err(ProofSetError::ProofSetNotLive(4))
    );
    assert_matches!(
        coordinator.prepare(&mut UploadTask::new(), &select(5), &NoopObserver).await,
        Err(ProofSetError::ProofSetNotFound { proof_set_id: 5, .. })
    );
}

#[tokio::test]
async fn test_explicit_provider() {
    let network = MockNetwork::new(3);
    let identity = test_identity();
    let coordinator = coordinator(&network, &identity);

    let options = SelectionOptions {
        provider_id: Some(3),
        ..Default::default()
    };
    let target = coordinator
        .prepare(&mut UploadTask::new(), &options, &NoopObserver)
        .await
        .unwrap();
    assert_eq!(target.provider.id, 3);
    assert!(target.created);

    // The new set is reused on the next upload to the same provider.
    let options = SelectionOptions {
        provider_address: Some(network.provider(3).info().owner),
        ..Default::default()
    };
    let again = coordinator
        .prepare(&mut UploadTask::new(), &options, &NoopObserver)
        .await
        .unwrap();
    assert_eq!(again.proof_set_id, target.proof_set_id);
    assert!(!again.created);

    let options = SelectionOptions {
        provider_id: Some(1),
        provider_address: Some(network.provider(2).info().owner),
        ..Default::default()
    };
    assert_matches!(
        coordinator.prepare(&mut UploadTask::new(), &options, &NoopObserver).await,
        Err(ProofSetError::InconsistentSelection(_))
    );

    let options = SelectionOptions {
        provider_id: Some(42),
        ..Default::default()
    };
    assert_matches!(
        coordinator.prepare(&mut UploadTask::new(), &options, &NoopObserver).await,
        Err(ProofSetError::ProviderNotFound(_))
    );
}

#[tokio::test]
async fn test_skips_providers_failing_ping() {
    let network = MockNetwork::new(3);
    network.provider(1).set_failure(ops::PING, 503);
    network.provider(3).set_failure(ops::PING, 503);
    let identity = test_identity();

    let target = coordinator(&network, &identity)
        .prepare(&mut UploadTask::new(), &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(target.provider.id, 2);

    network.provider(2).set_failure(ops::PING, 503);
    let fresh = test_identity();
    let err = coordinator(&network, &fresh)
        .prepare(&mut UploadTask::new(), &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap_err();
    assert_matches!(err, ProofSetError::NoProviderAvailable { tried: 3 });
}

#[tokio::test(start_paused = true)]
async fn test_creation_timeout() {
    let network = MockNetwork::new(1);
    network.provider(1).stall_creation();
    let identity = test_identity();

    let mut task = UploadTask::new();
    let started = tokio::time::Instant::now();
    let err = coordinator(&network, &identity)
        .prepare(&mut task, &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ProofSetError::ProofSetCreationTimeout {
            stage: CoordinatorState::WaitingForCreateTx,
            ..
        }
    );
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(task.state(), CoordinatorState::CreationFailed);
    assert_eq!(started.elapsed(), PollConfig::DEFAULT_TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn test_creation_waits_for_liveness() {
    let network = MockNetwork::new(1);
    network.provider(1).hold_liveness();
    let identity = test_identity();

    let mut task = UploadTask::new();
    let err = coordinator(&network, &identity)
        .prepare(&mut task, &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ProofSetError::ProofSetCreationTimeout {
            stage: CoordinatorState::WaitingForLive,
            ..
        }
    );
    assert_eq!(task.state(), CoordinatorState::CreationFailed);
}

#[tokio::test]
async fn test_rejected_creation() {
    let network = MockNetwork::new(1);
    network.provider(1).reject_creation();
    let identity = test_identity();

    let mut task = UploadTask::new();
    let err = coordinator(&network, &identity)
        .prepare(&mut task, &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap_err();
    assert_matches!(err, ProofSetError::CreationFailed { .. });
    assert_eq!(task.state(), CoordinatorState::CreationFailed);
}

#[tokio::test(start_paused = true)]
async fn test_provider_reports_transactions_unknown_to_ledger() {
    let network = MockNetwork::new(1);
    network.provider(1).hide_transactions();
    let identity = test_identity();
    let coordinator = coordinator(&network, &identity);

    let mut task = UploadTask::new();
    let target = coordinator
        .prepare(&mut task, &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert!(target.created);

    let ids = coordinator
        .add_roots(&mut task, &target, &[root(5)], &NoopObserver)
        .await
        .unwrap();

    assert_eq!(ids, vec![0]);
    assert_eq!(task.state(), CoordinatorState::Complete);
    assert!(network.provider(1).calls(ops::CREATION_STATUS) >= 2);
    assert!(network.provider(1).calls(ops::ROOT_ADDITION_STATUS) >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_provider_reported_rejection() {
    let network = MockNetwork::new(1);
    network.provider(1).hide_transactions();
    network.provider(1).reject_creation();
    let identity = test_identity();

    let mut task = UploadTask::new();
    let err = coordinator(&network, &identity)
        .prepare(&mut task, &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap_err();

    assert_matches!(err, ProofSetError::CreationFailed { .. });
    assert_eq!(task.state(), CoordinatorState::CreationFailed);
}

#[tokio::test]
async fn test_add_roots_confirms_ids_once() {
    let network = MockNetwork::new(1);
    let identity = test_identity();
    let p1 = network.provider(1).info().owner;
    network
        .ledger
        .insert_proof_set(live_proof_set(9, identity.address(), p1, false, &[piece(1), piece(2)]));

    let coordinator = coordinator(&network, &identity);
    let recorder = Recorder::default();
    let mut task = UploadTask::new();
    let target = coordinator
        .prepare(&mut task, &SelectionOptions::default(), &recorder)
        .await
        .unwrap();
    let ids = coordinator
        .add_roots(&mut task, &target, &[root(3), root(4)], &recorder)
        .await
        .unwrap();

    assert_eq!(ids, vec![2, 3]);
    assert_eq!(task.state(), CoordinatorState::Complete);
    assert_eq!(network.ledger.proof_set(9).unwrap().roots.len(), 4);

    let confirmations: Vec<_> = recorder
        .events()
        .into_iter()
        .filter(|e| e.starts_with("roots_"))
        .collect();
    assert_eq!(confirmations, vec!["roots_added:submitted", "roots_confirmed:[2, 3]"]);
}

#[tokio::test]
async fn test_legacy_provider_completes_on_acknowledgement() {
    let network = MockNetwork::new(1);
    network.provider(1).set_legacy_roots(true);
    let identity = test_identity();
    let p1 = network.provider(1).info().owner;
    network
        .ledger
        .insert_proof_set(live_proof_set(2, identity.address(), p1, false, &[piece(1)]));

    let coordinator = coordinator(&network, &identity);
    let mut task = UploadTask::new();
    let target = coordinator
        .prepare(&mut task, &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap();
    let ids = coordinator
        .add_roots(&mut task, &target, &[root(5)], &NoopObserver)
        .await
        .unwrap();

    assert_eq!(ids, vec![1]);
    assert_eq!(
        task.history().last(),
        Some(&CoordinatorState::Complete)
    );
    assert!(!task.history().contains(&CoordinatorState::WaitingForRootTx));
    assert_eq!(network.provider(1).calls(ops::ROOT_ADDITION_STATUS), 0);
}

#[tokio::test(start_paused = true)]
async fn test_root_addition_timeout_and_rejection() {
    let network = MockNetwork::new(1);
    let identity = test_identity();
    let p1 = network.provider(1).info().owner;
    network
        .ledger
        .insert_proof_set(live_proof_set(6, identity.address(), p1, false, &[]));
    let coordinator = coordinator(&network, &identity);

    network.provider(1).stall_root_addition();
    let mut task = UploadTask::new();
    let target = coordinator
        .prepare(&mut task, &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap();
    let err = coordinator
        .add_roots(&mut task, &target, &[root(1)], &NoopObserver)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ProofSetError::RootAdditionTimeout {
            proof_set_id: 6,
            stage: CoordinatorState::WaitingForRootTx,
            ..
        }
    );
    assert_eq!(task.state(), CoordinatorState::RootAdditionFailed);

    network.provider(1).reject_root_addition();
    let mut task = UploadTask::new();
    let target = coordinator
        .prepare(&mut task, &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_matches!(
        coordinator.add_roots(&mut task, &target, &[root(1)], &NoopObserver).await,
        Err(ProofSetError::RootAdditionFailed { proof_set_id: 6, .. })
    );
}

#[tokio::test]
async fn test_add_roots_requires_ready_task() {
    let network = MockNetwork::new(1);
    let identity = test_identity();
    let p1 = network.provider(1).info().owner;
    network
        .ledger
        .insert_proof_set(live_proof_set(1, identity.address(), p1, false, &[]));
    let coordinator = coordinator(&network, &identity);

    let mut task = UploadTask::new();
    let target = coordinator
        .prepare(&mut task, &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap();

    assert_matches!(
        coordinator.add_roots(&mut task, &target, &[], &NoopObserver).await,
        Err(ProofSetError::NoRoots)
    );
    assert_matches!(
        coordinator
            .add_roots(&mut UploadTask::new(), &target, &[root(1)], &NoopObserver)
            .await,
        Err(ProofSetError::InvalidTransition(_))
    );
}

#[tokio::test]
async fn test_directory_outage_is_transient() {
    let network = MockNetwork::new(1);
    network.ledger.set_unavailable(true);
    let identity = test_identity();

    let err = coordinator(&network, &identity)
        .prepare(&mut UploadTask::new(), &SelectionOptions::default(), &NoopObserver)
        .await
        .unwrap_err();
    assert_matches!(err, ProofSetError::Directory(_));
    assert_eq!(err.kind(), ErrorKind::Transient);
}
