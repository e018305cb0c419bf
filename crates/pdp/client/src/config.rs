//! Client configuration.

use serde::{Deserialize, Serialize};
use tessera_proofset::CoordinatorConfig;
use tessera_upload::UploadConfig;

/// Polling and size limits for a [`StorageClient`](crate::StorageClient).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Proof set creation and root addition.
    pub proof_sets: CoordinatorConfig,
    /// Upload limits and parking.
    pub upload: UploadConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sections_default_independently() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"proof_sets":{"creation":{"interval":"10s","timeout":"1m"}}}"#,
        )
        .unwrap();

        assert_eq!(config.proof_sets.creation.interval, Duration::from_secs(10));
        assert_eq!(config.proof_sets.root_addition, CoordinatorConfig::default().root_addition);
        assert_eq!(config.upload, UploadConfig::default());
    }
}
