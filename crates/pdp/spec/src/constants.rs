//! Well-known network constants.

/// EIP-712 domain name of the PDP service contract.
pub const DOMAIN_NAME: &str = "PandoraService";

/// EIP-712 domain version of the PDP service contract.
pub const DOMAIN_VERSION: &str = "1";

pub(crate) mod mainnet {
    pub(crate) const CHAIN_ID: u64 = 314;
    pub(crate) const NETWORK_NAME: &str = "mainnet";
    pub(crate) const CDN_HOST: &str = "filcdn.io";
}

pub(crate) mod calibration {
    pub(crate) const CHAIN_ID: u64 = 314_159;
    pub(crate) const NETWORK_NAME: &str = "calibration";
    pub(crate) const CDN_HOST: &str = "calibration.filcdn.io";
}
