//! The signing identity capability and a local-key implementation.

use alloy_primitives::{Address, B256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{Eip712Domain, SolStruct};
use async_trait::async_trait;
use tessera_primitives::{ClientDatasetId, RootData, RootId};
use tessera_spec::NetworkSpec;

use crate::{
    AuthSignature,
    error::{Result, SignerError},
    typed::{AddRoots, CreateProofSet},
};

/// Produces the client signatures the service contract checks.
///
/// Providers forward these signatures on-chain inside each request's
/// `extraData`.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait SigningIdentity: Send + Sync {
    /// Address that pays for, and owns, the client's proof sets.
    fn address(&self) -> Address;

    /// Sign a proof set creation request.
    async fn sign_create_proof_set(
        &self,
        client_dataset_id: ClientDatasetId,
        payee: Address,
        with_cdn: bool,
    ) -> Result<AuthSignature>;

    /// Sign a root addition request.
    async fn sign_add_roots(
        &self,
        client_dataset_id: ClientDatasetId,
        first_root_id: RootId,
        roots: &[RootData],
    ) -> Result<AuthSignature>;
}

/// A [`SigningIdentity`] backed by a private key held in memory.
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    signer: PrivateKeySigner,
    domain: Eip712Domain,
}

impl LocalIdentity {
    /// Create an identity signing in `spec`'s service contract domain.
    pub fn new(signer: PrivateKeySigner, spec: &NetworkSpec) -> Self {
        Self {
            signer,
            domain: spec.eip712_domain(),
        }
    }

    /// Parse a hex-encoded private key.
    pub fn from_hex(key: &str, spec: &NetworkSpec) -> Result<Self> {
        let signer = key
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self::new(signer, spec))
    }

    /// Generate a throwaway identity.
    pub fn random(spec: &NetworkSpec) -> Self {
        Self::new(PrivateKeySigner::random(), spec)
    }

    /// The domain signatures are produced in.
    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    async fn sign(&self, hash: B256) -> Result<AuthSignature> {
        let signature = self.signer.sign_hash(&hash).await?;
        Ok(AuthSignature::new(signature, hash, self.signer.address()))
    }
}

#[async_trait]
impl SigningIdentity for LocalIdentity {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_create_proof_set(
        &self,
        client_dataset_id: ClientDatasetId,
        payee: Address,
        with_cdn: bool,
    ) -> Result<AuthSignature> {
        let message = CreateProofSet::build(client_dataset_id, payee, with_cdn);
        self.sign(message.eip712_signing_hash(&self.domain)).await
    }

    async fn sign_add_roots(
        &self,
        client_dataset_id: ClientDatasetId,
        first_root_id: RootId,
        roots: &[RootData],
    ) -> Result<AuthSignature> {
        let message = AddRoots::build(client_dataset_id, first_root_id, roots);
        self.sign(message.eip712_signing_hash(&self.domain)).await
    }
}
