//! Ledger and network fixtures.

use alloy_primitives::address;
use std::sync::Arc;
use tessera_directory::{InMemoryLedger, LedgerProofSet, ProofSetRecord, ProviderDirectory};
use tessera_piece::PieceCommitment;
use tessera_primitives::{Address, ProofSetId, ProviderInfo, RootEntry};
use tessera_signer::LocalIdentity;
use tessera_spec::NetworkSpec;

use crate::{MockConnector, MockProvider};

/// Service contract used by the fixtures.
pub const SERVICE: Address = address!("0x5e55000000000000000000000000000000000001");

/// Verifier contract used by the fixtures.
pub const VERIFIER: Address = address!("0x7e21000000000000000000000000000000000002");

/// A calibration network spec using the fixture contracts.
pub fn test_spec() -> NetworkSpec {
    NetworkSpec::calibration()
        .service_contract(SERVICE)
        .verifier_contract(VERIFIER)
        .build()
        .unwrap_or_else(|e| panic!("fixture spec: {e}"))
}

/// A fresh random client identity on [`test_spec`].
pub fn test_identity() -> LocalIdentity {
    LocalIdentity::random(&test_spec())
}

/// Provider `n`, owned by `0x00..0n` and served from `http://spN.invalid/`.
pub fn provider_info(n: u8) -> ProviderInfo {
    let url: url::Url = format!("http://sp{n}.invalid/")
        .parse()
        .unwrap_or_else(|e| panic!("fixture url: {e}"));
    ProviderInfo {
        id: u64::from(n),
        owner: Address::with_last_byte(n),
        pdp_url: url.clone(),
        retrieval_url: url,
        registered_at: 100,
        approved_at: 101,
    }
}

/// `len` deterministic, non-repeating bytes seeded by `seed`.
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) ^ (i >> 8) as u8)
        .collect()
}

/// A live, managed proof set holding `roots`.
pub fn live_proof_set(
    id: ProofSetId,
    payer: Address,
    payee: Address,
    with_cdn: bool,
    roots: &[(PieceCommitment, u64)],
) -> LedgerProofSet {
    LedgerProofSet {
        record: ProofSetRecord {
            pdp_proof_set_id: id,
            rail_id: id,
            payer,
            payee,
            client_dataset_id: id,
            with_cdn,
        },
        is_live: true,
        listener: SERVICE,
        next_root_id: roots.len() as u64,
        roots: roots
            .iter()
            .enumerate()
            .map(|(root_id, (piece, raw_size))| RootEntry {
                piece: *piece,
                raw_size: *raw_size,
                root_id: root_id as u64,
            })
            .collect(),
    }
}

/// An in-memory ledger with approved mock providers behind a connector.
#[derive(Clone, Debug)]
pub struct MockNetwork {
    /// Shared ledger.
    pub ledger: InMemoryLedger,
    /// Connector returning [`MockNetwork::providers`].
    pub connector: MockConnector,
    /// Approved providers, numbered from 1.
    pub providers: Vec<MockProvider>,
}

impl MockNetwork {
    /// A network with `count` approved providers.
    pub fn new(count: u8) -> Self {
        let ledger = InMemoryLedger::new(SERVICE);
        let connector = MockConnector::new(ledger.clone());
        let providers = (1..=count)
            .map(|n| {
                let info = provider_info(n);
                ledger.add_provider(info.clone());
                let provider = MockProvider::new(info, ledger.clone());
                connector.register(provider.clone());
                provider
            })
            .collect();
        Self {
            ledger,
            connector,
            providers,
        }
    }

    /// Provider `n`, counting from 1.
    pub fn provider(&self, n: usize) -> &MockProvider {
        self.providers
            .get(n.wrapping_sub(1))
            .unwrap_or_else(|| panic!("no mock provider {n}"))
    }

    /// A directory over the ledger.
    pub fn directory(&self) -> ProviderDirectory {
        ProviderDirectory::new(self.ledger.clone(), self.ledger.clone())
    }

    /// The connector behind an `Arc`, ready to hand to a coordinator.
    pub fn shared_connector(&self) -> Arc<MockConnector> {
        Arc::new(self.connector.clone())
    }
}
