//! `tessera commp`.

use eyre::{Result, WrapErr};
use std::path::Path;
use tessera_piece::{PieceCommitment, PieceHasher};
use tokio::{fs::File, io::AsyncReadExt};

use crate::cli::CommpArgs;

/// Read buffer size.
const CHUNK_SIZE: usize = 1 << 20;

/// Compute the commitment of the file at `path` without loading it whole.
pub(crate) async fn commp_file(path: &Path) -> Result<(PieceCommitment, u64)> {
    let mut file = File::open(path)
        .await
        .wrap_err_with(|| format!("failed to open {}", path.display()))?;
    let mut hasher = PieceHasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf).await?;
        let Some(chunk) = buf.get(..read).filter(|chunk| !chunk.is_empty()) else {
            break;
        };
        hasher.update(chunk);
    }

    let size = hasher.bytes_written();
    Ok((hasher.finalize()?, size))
}

pub(crate) async fn run(args: &CommpArgs) -> Result<()> {
    let (piece, size) = commp_file(&args.file).await?;
    println!("piece:  {piece}");
    println!("legacy: {}", piece.to_legacy_string());
    println!("digest: {}", piece.legacy_digest());
    println!("size:   {size}");
    Ok(())
}
