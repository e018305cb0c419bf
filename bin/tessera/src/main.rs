//! Tessera command-line client.

mod cli;
mod commands;
mod config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    cli::run().await
}
