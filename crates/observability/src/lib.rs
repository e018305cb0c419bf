//! Logging initialisation shared by tessera binaries.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod logging;

pub use logging::{LogArgs, init_logging};
