//! Figment-based configuration loading.
//!
//! Configuration priority (highest wins):
//! 1. CLI arguments (applied after Figment load)
//! 2. Config file (TOML)
//! 3. Environment variables (`TESSERA_` prefix, `__` between sections)
//! 4. Defaults

use eyre::{Result, WrapErr, eyre};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tessera_client::ClientConfig;
use tessera_primitives::Address;
use tessera_spec::NetworkSpec;

use crate::cli::GlobalArgs;

/// Default ledger snapshot location.
const DEFAULT_LEDGER: &str = "ledger.toml";

/// Well-known networks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum NetworkName {
    /// Filecoin calibration testnet.
    #[default]
    Calibration,
    /// Filecoin mainnet.
    Mainnet,
}

/// Which network to talk to and its contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct NetworkConfig {
    /// Preset chain.
    pub(crate) chain: NetworkName,
    /// Full spec for a custom deployment. Takes precedence over everything
    /// else in this section.
    pub(crate) spec_file: Option<PathBuf>,
    /// Service contract address.
    pub(crate) service_contract: Option<Address>,
    /// Verifier contract address.
    pub(crate) verifier_contract: Option<Address>,
    /// CDN hostname override.
    pub(crate) cdn_host: Option<String>,
}

impl NetworkConfig {
    /// Resolve the network spec.
    pub(crate) fn spec(&self) -> Result<NetworkSpec> {
        if let Some(path) = &self.spec_file {
            return NetworkSpec::from_file(path)
                .wrap_err_with(|| format!("failed to load network spec {}", path.display()));
        }

        let mut builder = match self.chain {
            NetworkName::Calibration => NetworkSpec::calibration(),
            NetworkName::Mainnet => NetworkSpec::mainnet(),
        };
        if let Some(address) = self.service_contract {
            builder = builder.service_contract(address);
        }
        if let Some(address) = self.verifier_contract {
            builder = builder.verifier_contract(address);
        }
        if let Some(host) = &self.cdn_host {
            builder = builder.cdn_host(host);
        }
        Ok(builder.build()?)
    }
}

/// Complete CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct TesseraConfig {
    /// Network selection.
    pub(crate) network: NetworkConfig,
    /// Ledger snapshot the directory reads.
    pub(crate) ledger: PathBuf,
    /// Hex private key of the paying client.
    pub(crate) private_key: Option<String>,
    /// Polling and upload limits.
    pub(crate) client: ClientConfig,
}

impl Default for TesseraConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            ledger: PathBuf::from(DEFAULT_LEDGER),
            private_key: None,
            client: ClientConfig::default(),
        }
    }
}

impl TesseraConfig {
    /// Load configuration from defaults, environment, and config file.
    /// CLI overrides should be applied separately after loading.
    pub(crate) fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("TESSERA_").split("__"));

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(eyre!("config file {} does not exist", path.display()));
            }
            figment = figment.merge(Toml::file(path));
        }

        figment.extract().wrap_err("Failed to load configuration")
    }

    /// Apply command-line overrides.
    pub(crate) fn apply_args(&mut self, args: &GlobalArgs) {
        if let Some(network) = args.network {
            self.network.chain = network;
        }
        if let Some(ledger) = &args.ledger {
            self.ledger = ledger.clone();
        }
        if let Some(key) = &args.private_key {
            self.private_key = Some(key.clone());
        }
    }

    /// The configured private key.
    pub(crate) fn private_key(&self) -> Result<&str> {
        self.private_key
            .as_deref()
            .ok_or_else(|| eyre!("no private key configured: pass --private-key or set TESSERA_PRIVATE_KEY"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, time::Duration};
    use tempfile::TempDir;

    const SERVICE: &str = "0x5e55000000000000000000000000000000000001";
    const VERIFIER: &str = "0x7e21000000000000000000000000000000000002";

    #[test]
    fn test_default_config() {
        let config = TesseraConfig::default();
        assert_eq!(config.network.chain, NetworkName::Calibration);
        assert_eq!(config.ledger, PathBuf::from("ledger.toml"));
        assert!(config.private_key.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tessera.toml");
        fs::write(
            &config_path,
            format!(
                r#"
ledger = "dev-ledger.toml"

[network]
chain = "mainnet"
service_contract = "{SERVICE}"
verifier_contract = "{VERIFIER}"

[client.upload.parking]
interval = "10s"
timeout = "2m"
"#
            ),
        )
        .unwrap();

        let config = TesseraConfig::load(Some(&config_path)).unwrap();
        assert_eq!(config.ledger, PathBuf::from("dev-ledger.toml"));
        assert_eq!(config.client.upload.parking.interval, Duration::from_secs(10));
        assert_eq!(config.client.upload.parking.timeout, Duration::from_secs(120));

        let spec = config.network.spec().unwrap();
        assert!(spec.is_mainnet());
        assert_eq!(spec.cdn_host(), Some("filcdn.io"));
        assert_eq!(spec.service_contract, SERVICE.parse::<Address>().unwrap());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        assert!(TesseraConfig::load(Some(&config_path)).is_err());
    }

    #[test]
    fn test_spec_requires_contracts() {
        let config = TesseraConfig::default();
        assert!(config.network.spec().is_err());
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = TesseraConfig::default();
        config.apply_args(&GlobalArgs {
            config: None,
            network: Some(NetworkName::Mainnet),
            ledger: Some(PathBuf::from("other.toml")),
            private_key: Some("0x01".to_string()),
        });

        assert_eq!(config.network.chain, NetworkName::Mainnet);
        assert_eq!(config.ledger, PathBuf::from("other.toml"));
        assert_eq!(config.private_key().unwrap(), "0x01");
    }
}
