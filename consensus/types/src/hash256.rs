/// A 32-byte hash, used as block/state root and committee-seed material.
///
/// Re-exported from `ethereum-types`, which `eth2_ssz` and `tree_hash` provide `Encode`/`Decode`/
/// `TreeHash` implementations for.
pub type Hash256 = ethereum_types::H256;
