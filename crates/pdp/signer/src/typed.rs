//! EIP-712 typed data accepted by the service contract.
//!
//! ```text
//! CreateProofSet(uint256 clientDataSetId,bool withCDN,address payee)
//! AddRoots(uint256 clientDataSetId,uint256 firstAdded,RootData[] rootData)
//! RootData(Cid root,uint256 rawSize)
//! Cid(bytes data)
//! ```

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;
use tessera_primitives::{ClientDatasetId, RootId};

sol! {
    /// Authorises creation of a proof set with one provider.
    #[derive(Debug, PartialEq, Eq)]
    struct CreateProofSet {
        uint256 clientDataSetId;
        bool withCDN;
        address payee;
    }

    /// Binary CID of a piece.
    #[derive(Debug, PartialEq, Eq)]
    struct Cid {
        bytes data;
    }

    /// One piece being added.
    #[derive(Debug, PartialEq, Eq)]
    struct RootData {
        Cid root;
        uint256 rawSize;
    }

    /// Authorises adding roots to a proof set, starting at `firstAdded`.
    #[derive(Debug, PartialEq, Eq)]
    struct AddRoots {
        uint256 clientDataSetId;
        uint256 firstAdded;
        RootData[] rootData;
    }
}

impl CreateProofSet {
    pub(crate) fn build(client_dataset_id: ClientDatasetId, payee: Address, with_cdn: bool) -> Self {
        Self {
            clientDataSetId: U256::from(client_dataset_id),
            withCDN: with_cdn,
            payee,
        }
    }
}

impl AddRoots {
    pub(crate) fn build(
        client_dataset_id: ClientDatasetId,
        first_root_id: RootId,
        roots: &[tessera_primitives::RootData],
    ) -> Self {
        Self {
            clientDataSetId: U256::from(client_dataset_id),
            firstAdded: U256::from(first_root_id),
            rootData: roots
                .iter()
                .map(|root| RootData {
                    root: Cid {
                        data: root.piece.legacy_cid().to_bytes().into(),
                    },
                    rawSize: U256::from(root.raw_size),
                })
                .collect(),
        }
    }
}
