//! Client error types.

use tessera_directory::DirectoryError;
use tessera_primitives::{Classify, ErrorKind};
use tessera_provider::ProviderError;
use tessera_retrieval::RetrievalError;
use tessera_upload::UploadError;
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by [`StorageClient`](crate::StorageClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// An upload failed.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// A download failed.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// A directory query failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Http(#[from] ProviderError),
}

impl Classify for ClientError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Upload(e) => e.kind(),
            Self::Retrieval(e) => e.kind(),
            Self::Directory(e) => e.kind(),
            Self::Http(e) => e.kind(),
        }
    }
}
