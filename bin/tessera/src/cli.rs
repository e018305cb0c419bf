//! Command-line interface.

use clap::{Args, Parser, Subcommand};
use eyre::Result;
use std::path::PathBuf;
use tessera_observability::{LogArgs, init_logging};
use tessera_primitives::{Address, ProofSetId, ProviderId};
use tracing::info;

use crate::{
    commands,
    config::{NetworkName, TesseraConfig},
};

/// Tessera - store and retrieve data with PDP storage providers
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Logging configuration (applies to all subcommands).
    #[command(flatten)]
    pub(crate) logs: LogArgs,

    /// Configuration overrides.
    #[command(flatten)]
    pub(crate) global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub(crate) struct GlobalArgs {
    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,

    /// Network to use
    #[arg(long, global = true, value_enum)]
    pub(crate) network: Option<NetworkName>,

    /// Ledger snapshot backing the provider directory
    #[arg(long, global = true, value_name = "FILE")]
    pub(crate) ledger: Option<PathBuf>,

    /// Hex private key of the paying client
    #[arg(long = "private-key", global = true, value_name = "HEX")]
    pub(crate) private_key: Option<String>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Compute the piece commitment of a file.
    Commp(CommpArgs),
    /// List approved providers.
    Providers,
    /// List the client's proof sets.
    ProofSets,
    /// Upload a file.
    Upload(UploadArgs),
    /// Download and verify a piece.
    Download(DownloadArgs),
}

/// Arguments for `commp`.
#[derive(Debug, Args)]
pub(crate) struct CommpArgs {
    /// File to hash
    pub(crate) file: PathBuf,
}

/// Arguments for `upload`.
#[derive(Debug, Args)]
pub(crate) struct UploadArgs {
    /// File to upload
    pub(crate) file: PathBuf,

    /// Store with this provider (registry id)
    #[arg(long, value_name = "ID")]
    pub(crate) provider_id: Option<ProviderId>,

    /// Store with this provider (address)
    #[arg(long, value_name = "ADDRESS")]
    pub(crate) provider_address: Option<Address>,

    /// Add to this proof set
    #[arg(long, value_name = "ID")]
    pub(crate) proof_set_id: Option<ProofSetId>,

    /// Use a CDN-enabled proof set
    #[arg(long)]
    pub(crate) cdn: bool,
}

/// Arguments for `download`.
#[derive(Debug, Args)]
pub(crate) struct DownloadArgs {
    /// Piece commitment, in either form
    pub(crate) piece: String,

    /// Where to write the data
    #[arg(short, long, value_name = "FILE")]
    pub(crate) output: PathBuf,

    /// Fetch from this provider only
    #[arg(long, value_name = "ADDRESS")]
    pub(crate) provider_address: Option<Address>,

    /// Try the CDN first
    #[arg(long)]
    pub(crate) cdn: bool,
}

/// Parse arguments, set up logging and run the selected command.
pub(crate) async fn run() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(&cli.logs)?;
    info!("Starting tessera {}", env!("CARGO_PKG_VERSION"));

    // commp needs no network or ledger.
    if let Commands::Commp(args) = &cli.command {
        return commands::commp::run(args).await;
    }

    let mut config = TesseraConfig::load(cli.global.config.as_deref())?;
    config.apply_args(&cli.global);

    match cli.command {
        Commands::Commp(_) => Ok(()),
        Commands::Providers => commands::providers::run(&config).await,
        Commands::ProofSets => commands::proof_sets::run(&config).await,
        Commands::Upload(args) => commands::upload::run(&config, &args).await,
        Commands::Download(args) => commands::download::run(&config, &args).await,
    }
}
