//! Concrete network specifications.

use alloy_chains::Chain;
use alloy_primitives::Address;
use alloy_sol_types::{Eip712Domain, eip712_domain};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    constants::{DOMAIN_NAME, DOMAIN_VERSION, calibration, mainnet},
    error::NetworkSpecError,
};

/// A PDP storage network.
///
/// Captures the chain the network settles on, the two contracts a client
/// talks to, and where the CDN for that chain lives. Mainnet and calibration
/// have known chain ids and CDN hosts; contract addresses are always supplied
/// by the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Underlying chain.
    pub chain: Chain,

    /// Human-readable name.
    #[serde(default)]
    pub network_name: String,

    /// Service contract: record keeper for proof sets and EIP-712 verifying
    /// contract for client signatures.
    pub service_contract: Address,

    /// Low-level proof verification contract.
    pub verifier_contract: Address,

    /// CDN hostname override. Falls back to the chain's well-known host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn_host: Option<String>,
}

impl NetworkSpec {
    /// Start a builder for mainnet.
    pub fn mainnet() -> NetworkSpecBuilder {
        NetworkSpecBuilder::new()
            .chain(Chain::from_id(mainnet::CHAIN_ID))
            .network_name(mainnet::NETWORK_NAME)
    }

    /// Start a builder for the calibration testnet.
    pub fn calibration() -> NetworkSpecBuilder {
        NetworkSpecBuilder::new()
            .chain(Chain::from_id(calibration::CHAIN_ID))
            .network_name(calibration::NETWORK_NAME)
    }

    /// Chain id.
    pub fn chain_id(&self) -> u64 {
        self.chain.id()
    }

    /// Whether this is mainnet.
    pub fn is_mainnet(&self) -> bool {
        self.chain_id() == mainnet::CHAIN_ID
    }

    /// Whether this is the calibration testnet.
    pub fn is_calibration(&self) -> bool {
        self.chain_id() == calibration::CHAIN_ID
    }

    /// Hostname the CDN serves this network from, if any.
    pub fn cdn_host(&self) -> Option<&str> {
        if let Some(host) = self.cdn_host.as_deref() {
            return Some(host);
        }
        match self.chain_id() {
            mainnet::CHAIN_ID => Some(mainnet::CDN_HOST),
            calibration::CHAIN_ID => Some(calibration::CDN_HOST),
            _ => None,
        }
    }

    /// EIP-712 domain client signatures are produced in.
    pub fn eip712_domain(&self) -> Eip712Domain {
        eip712_domain! {
            name: DOMAIN_NAME,
            version: DOMAIN_VERSION,
            chain_id: self.chain_id(),
            verifying_contract: self.service_contract,
        }
    }

    /// Load a spec from a TOML file.
    ///
    /// ```toml
    /// chain = 314159
    /// network_name = "calibration"
    /// service_contract = "0x..."
    /// verifier_contract = "0x..."
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, NetworkSpecError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a spec from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, NetworkSpecError> {
        Ok(toml::from_str(s)?)
    }
}

/// Builder for [`NetworkSpec`].
#[derive(Debug, Default, Clone)]
pub struct NetworkSpecBuilder {
    chain: Option<Chain>,
    network_name: Option<String>,
    service_contract: Option<Address>,
    verifier_contract: Option<Address>,
    cdn_host: Option<String>,
}

impl NetworkSpecBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chain.
    pub fn chain(mut self, chain: Chain) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Set the network name.
    pub fn network_name(mut self, name: impl ToString) -> Self {
        self.network_name = Some(name.to_string());
        self
    }

    /// Set the service contract address.
    pub fn service_contract(mut self, address: Address) -> Self {
        self.service_contract = Some(address);
        self
    }

    /// Set the verifier contract address.
    pub fn verifier_contract(mut self, address: Address) -> Self {
        self.verifier_contract = Some(address);
        self
    }

    /// Override the CDN hostname.
    pub fn cdn_host(mut self, host: impl ToString) -> Self {
        self.cdn_host = Some(host.to_string());
        self
    }

    /// Build the specification.
    pub fn build(self) -> Result<NetworkSpec, NetworkSpecError> {
        let chain = self.chain.unwrap_or(Chain::from_id(calibration::CHAIN_ID));
        let network_name = self
            .network_name
            .unwrap_or_else(|| format!("chain-{}", chain.id()));

        Ok(NetworkSpec {
            chain,
            network_name,
            service_contract: self
                .service_contract
                .ok_or(NetworkSpecError::MissingContract("service"))?,
            verifier_contract: self
                .verifier_contract
                .ok_or(NetworkSpecError::MissingContract("verifier"))?,
            cdn_host: self.cdn_host,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn spec() -> NetworkSpec {
        NetworkSpec::calibration()
            .service_contract(Address::repeat_byte(0x11))
            .verifier_contract(Address::repeat_byte(0x22))
            .build()
            .unwrap()
    }

    #[test]
    fn test_presets() {
        let calibration = spec();
        assert!(calibration.is_calibration());
        assert_eq!(calibration.cdn_host(), Some("calibration.filcdn.io"));

        let mainnet = NetworkSpec::mainnet()
            .service_contract(Address::repeat_byte(0x11))
            .verifier_contract(Address::repeat_byte(0x22))
            .build()
            .unwrap();
        assert!(mainnet.is_mainnet());
        assert_eq!(mainnet.chain_id(), 314);
        assert_eq!(mainnet.cdn_host(), Some("filcdn.io"));
    }

    #[test]
    fn test_custom_chain_has_no_cdn_unless_configured() {
        let custom = NetworkSpecBuilder::new()
            .chain(Chain::from_id(31337))
            .service_contract(Address::ZERO)
            .verifier_contract(Address::ZERO)
            .build()
            .unwrap();
        assert_eq!(custom.network_name, "chain-31337");
        assert_eq!(custom.cdn_host(), None);

        let custom = NetworkSpecBuilder::new()
            .chain(Chain::from_id(31337))
            .service_contract(Address::ZERO)
            .verifier_contract(Address::ZERO)
            .cdn_host("cdn.local")
            .build()
            .unwrap();
        assert_eq!(custom.cdn_host(), Some("cdn.local"));
    }

    #[test]
    fn test_missing_contract() {
        let err = NetworkSpec::mainnet()
            .service_contract(Address::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, NetworkSpecError::MissingContract("verifier")));
    }

    #[test]
    fn test_domain() {
        let spec = spec();
        let domain = spec.eip712_domain();
        assert_eq!(domain.chain_id, Some(U256::from(314_159u64)));
        assert_eq!(domain.verifying_contract, Some(Address::repeat_byte(0x11)));
        assert_eq!(domain.name.as_deref(), Some(DOMAIN_NAME));
    }

    #[test]
    fn test_toml_roundtrip() {
        let spec = spec();
        let toml = toml::to_string(&spec).unwrap();
        assert_eq!(NetworkSpec::from_toml(&toml).unwrap(), spec);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.toml");
        std::fs::write(&path, toml).unwrap();
        assert_eq!(NetworkSpec::from_file(&path).unwrap(), spec);
    }
}
