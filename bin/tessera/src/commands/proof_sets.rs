//! `tessera proof-sets`.

use eyre::Result;

use crate::{commands::storage_client, config::TesseraConfig};

pub(crate) async fn run(config: &TesseraConfig) -> Result<()> {
    let client = storage_client(config)?;
    let sets = client.proof_sets().await?;
    if sets.is_empty() {
        println!("no proof sets for {}", client.address());
        return Ok(());
    }

    println!("{:>6}  {:<42}  {:>5}  {:>5}  cdn", "id", "provider", "roots", "live");
    for set in sets {
        println!(
            "{:>6}  {:<42}  {:>5}  {:>5}  {}",
            set.pdp_proof_set_id, set.payee, set.root_count, set.is_live, set.with_cdn
        );
    }
    Ok(())
}
