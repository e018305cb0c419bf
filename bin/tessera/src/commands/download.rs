//! `tessera download`.

use eyre::{Result, WrapErr};
use tessera_client::FetchOptions;
use tracing::info;

use crate::{cli::DownloadArgs, commands::storage_client, config::TesseraConfig};

pub(crate) async fn run(config: &TesseraConfig, args: &DownloadArgs) -> Result<()> {
    let piece = tessera_piece::parse(&args.piece)
        .wrap_err_with(|| format!("invalid piece commitment {}", args.piece))?;
    let client = storage_client(config)?;

    let options = FetchOptions {
        provider_address: args.provider_address,
        with_cdn: args.cdn,
        ..FetchOptions::default()
    };
    let cancel = options.cancel.clone();
    let download = client.download(&piece, &options);
    tokio::pin!(download);

    let data = tokio::select! {
        data = &mut download => data?,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            download.await?
        }
    };

    tokio::fs::write(&args.output, &data)
        .await
        .wrap_err_with(|| format!("failed to write {}", args.output.display()))?;
    info!(%piece, bytes = data.len(), output = %args.output.display(), "Downloaded piece");
    Ok(())
}
