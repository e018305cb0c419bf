//! `tessera providers`.

use eyre::Result;

use crate::{commands::storage_client, config::TesseraConfig};

pub(crate) async fn run(config: &TesseraConfig) -> Result<()> {
    let client = storage_client(config)?;
    let providers = client.providers().await?;
    if providers.is_empty() {
        println!("no approved providers");
        return Ok(());
    }

    for provider in providers {
        println!("{:>4}  {}  {}", provider.id, provider.owner, provider.pdp_url);
    }
    Ok(())
}
