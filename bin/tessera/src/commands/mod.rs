//! Subcommand implementations.

pub(crate) mod commp;
pub(crate) mod download;
pub(crate) mod proof_sets;
pub(crate) mod providers;
pub(crate) mod upload;

use eyre::{Result, WrapErr};
use std::sync::Arc;
use tessera_client::StorageClient;
use tessera_directory::{InMemoryLedger, ProviderDirectory};
use tessera_signer::LocalIdentity;
use tracing::debug;

use crate::config::TesseraConfig;

/// Build a client from `config`, with the directory backed by the ledger
/// snapshot.
pub(crate) fn storage_client(config: &TesseraConfig) -> Result<StorageClient> {
    Ok(open(config)?.0)
}

/// Like [`storage_client`], also returning the ledger so callers can record
/// into it.
pub(crate) fn open(config: &TesseraConfig) -> Result<(StorageClient, InMemoryLedger)> {
    let spec = config.network.spec()?;
    let ledger = InMemoryLedger::load(&config.ledger)
        .wrap_err_with(|| format!("failed to load ledger {}", config.ledger.display()))?;
    debug!(ledger = %config.ledger.display(), network = %spec.network_name, "Loaded ledger");

    let identity = LocalIdentity::from_hex(config.private_key()?, &spec)
        .wrap_err("invalid private key")?;
    let directory = ProviderDirectory::new(ledger.clone(), ledger.clone());

    let client = StorageClient::builder(spec, directory, Arc::new(identity))
        .config(config.client)
        .build()?;
    Ok((client, ledger))
}
