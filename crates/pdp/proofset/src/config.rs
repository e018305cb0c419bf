//! Polling configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A bounded polling loop: check every `interval` until `timeout` elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Pause between checks.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Overall deadline, measured from the first check.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl PollConfig {
    /// Default overall deadline for every phase.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(7 * 60);

    /// Create a config.
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Defaults for proof set creation.
    pub const fn creation() -> Self {
        Self::new(Duration::from_secs(2), Self::DEFAULT_TIMEOUT)
    }

    /// Defaults for root addition.
    pub const fn root_addition() -> Self {
        Self::new(Duration::from_secs(1), Self::DEFAULT_TIMEOUT)
    }

    /// Defaults for piece parking.
    pub const fn parking() -> Self {
        Self::new(Duration::from_secs(5), Self::DEFAULT_TIMEOUT)
    }
}

/// Coordinator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Waiting for a new proof set to be created and go live.
    pub creation: PollConfig,
    /// Waiting for added roots to be confirmed.
    pub root_addition: PollConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            creation: PollConfig::creation(),
            root_addition: PollConfig::root_addition(),
        }
    }
}
