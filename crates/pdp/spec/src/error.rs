//! Error types for network specification loading.

/// Errors building or loading a [`NetworkSpec`](crate::NetworkSpec).
#[derive(Debug, thiserror::Error)]
pub enum NetworkSpecError {
    /// A required contract address was not provided.
    #[error("network spec is missing the {0} contract address")]
    MissingContract(&'static str),

    /// IO error reading the spec file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
