//! Connector handing out mock providers.

use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tessera_directory::InMemoryLedger;
use tessera_primitives::{Address, ProviderInfo};
use tessera_provider::{PdpProvider, ProviderConnector};

use crate::{MockProvider, ops};

/// A [`ProviderConnector`] returning registered [`MockProvider`]s.
///
/// Unregistered providers connect to a mock failing every call with 503.
#[derive(Clone, Debug)]
pub struct MockConnector {
    ledger: InMemoryLedger,
    providers: Arc<RwLock<HashMap<Address, MockProvider>>>,
}

impl MockConnector {
    /// An empty connector recording into `ledger`.
    pub fn new(ledger: InMemoryLedger) -> Self {
        Self {
            ledger,
            providers: Default::default(),
        }
    }

    /// Register `provider` under its owner address.
    pub fn register(&self, provider: MockProvider) {
        self.providers.write().insert(provider.info().owner, provider);
    }

    /// The mock registered for `owner`.
    pub fn provider(&self, owner: Address) -> Option<MockProvider> {
        self.providers.read().get(&owner).cloned()
    }

    fn unreachable(&self, info: &ProviderInfo) -> MockProvider {
        let provider = MockProvider::new(info.clone(), self.ledger.clone());
        for op in [
            ops::PING,
            ops::FIND_PIECE,
            ops::CHECK_PIECE,
            ops::PUT_PIECE,
            ops::DOWNLOAD_PIECE,
            ops::CREATE_PROOF_SET,
            ops::CREATION_STATUS,
            ops::PROOF_SET,
            ops::ADD_ROOTS,
            ops::ROOT_ADDITION_STATUS,
        ] {
            provider.set_failure(op, 503);
            provider.set_delay(op, Duration::from_millis(1));
        }
        provider
    }
}

impl ProviderConnector for MockConnector {
    fn connect(&self, info: &ProviderInfo) -> Arc<dyn PdpProvider> {
        let provider = self
            .provider(info.owner)
            .unwrap_or_else(|| self.unreachable(info));
        Arc::new(provider)
    }
}
