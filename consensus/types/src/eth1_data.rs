use crate::Hash256;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
    TreeHash,
)]
pub struct Eth1Data {
    pub deposit_root: Hash256,
    pub deposit_count: u64,
    pub block_hash: Hash256,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct DepositData {
    pub pubkey: crate::PublicKey,
    pub withdrawal_credentials: Hash256,
    pub amount: u64,
    pub signature: crate::Signature,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Deposit {
    /// Merkle proof from the leaf to the deposit contract's root. Full 33-entry proof
    /// construction is performed by the (external) deposit provider; only the bytes are
    /// threaded through here.
    pub proof: Vec<Hash256>,
    pub data: DepositData,
}
