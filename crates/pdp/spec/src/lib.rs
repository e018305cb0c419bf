//! PDP network specification
//!
//! A network specification answers "which deployment am I talking to?": the
//! chain, the service and verifier contracts, and the CDN hostname serving
//! that chain. Client-side policy (poll intervals, size limits) belongs in
//! configuration, not here.
//!
//! # Example
//!
//! ```ignore
//! use tessera_spec::NetworkSpec;
//!
//! let spec = NetworkSpec::calibration()
//!     .service_contract(service)
//!     .verifier_contract(verifier)
//!     .build()?;
//! assert_eq!(spec.cdn_host(), Some("calibration.filcdn.io"));
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod constants;
mod error;
mod spec;

pub use alloy_chains::Chain;
pub use constants::{DOMAIN_NAME, DOMAIN_VERSION};
pub use error::NetworkSpecError;
pub use spec::{NetworkSpec, NetworkSpecBuilder};
