//! Signed authorisations and the `extraData` payloads that carry them.

use alloy_primitives::{Address, B256, Bytes, Signature, hex};
use alloy_sol_types::SolValue;

use crate::error::{Result, SignerError};

/// A client signature over one EIP-712 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSignature {
    /// ECDSA signature (65 bytes: r[32] + s[32] + v[1]).
    pub signature: Bytes,
    /// The EIP-712 signing hash that was signed.
    pub signed_hash: B256,
    /// Address that produced the signature.
    pub signer: Address,
}

impl AuthSignature {
    /// Wrap a raw signature.
    pub fn new(signature: Signature, signed_hash: B256, signer: Address) -> Self {
        Self {
            signature: Bytes::copy_from_slice(&signature.as_bytes()),
            signed_hash,
            signer,
        }
    }

    /// Recover the signing address from the signature.
    pub fn recover(&self) -> Result<Address> {
        let signature = Signature::try_from(self.signature.as_ref())
            .map_err(|e| SignerError::Recovery(format!("invalid signature: {e}")))?;
        signature
            .recover_address_from_prehash(&self.signed_hash)
            .map_err(|e| SignerError::Recovery(e.to_string()))
    }

    /// `extraData` for a proof set creation request:
    /// `abi.encode(address payer, bool withCDN, bytes signature)`.
    pub fn create_proof_set_extra_data(&self, payer: Address, with_cdn: bool) -> String {
        let encoded = (payer, with_cdn, self.signature.clone()).abi_encode_params();
        hex::encode_prefixed(encoded)
    }

    /// `extraData` for a root addition request: `abi.encode(bytes signature)`.
    pub fn add_roots_extra_data(&self) -> String {
        let encoded = (self.signature.clone(),).abi_encode_params();
        hex::encode_prefixed(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthSignature {
        AuthSignature {
            signature: Bytes::from(vec![0xab; 65]),
            signed_hash: B256::ZERO,
            signer: Address::ZERO,
        }
    }

    #[test]
    fn test_create_extra_data_layout() {
        let payer = Address::repeat_byte(0x01);
        let data = auth().create_proof_set_extra_data(payer, true);
        let bytes = hex::decode(&data).unwrap();

        // head: payer, withCDN, offset; tail: length, 65 bytes padded to 96
        assert_eq!(bytes.len(), 32 * 3 + 32 + 96);
        assert_eq!(&bytes[12..32], payer.as_slice());
        assert_eq!(bytes[63], 1);
        assert_eq!(bytes[95], 0x60);
        assert_eq!(bytes[127], 65);

        let decoded = <(Address, bool, Bytes)>::abi_decode_params(&bytes).unwrap();
        assert_eq!(decoded, (payer, true, auth().signature));
    }

    #[test]
    fn test_add_roots_extra_data_layout() {
        let data = auth().add_roots_extra_data();
        assert!(data.starts_with("0x"));

        let bytes = hex::decode(&data).unwrap();
        assert_eq!(bytes.len(), 32 + 32 + 96);
        let (decoded,) = <(Bytes,)>::abi_decode_params(&bytes).unwrap();
        assert_eq!(decoded, auth().signature);
    }
}
