use crate::{Checkpoint, Epoch, Eth1Data, Fork, Hash256, Slot};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// The post-state of applying a block.
///
/// Re-implementing the state-transition function is out of scope: `BeaconState` here carries only
/// the fields the fork-choice engine, eth1 cache and operation pools read directly. A real
/// deployment's state-transition function produces the full value; this type models its
/// observable surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct BeaconState {
    pub genesis_time: u64,
    pub slot: Slot,
    pub fork: Fork,
    pub latest_block_header_root: Hash256,
    pub eth1_data: Eth1Data,
    pub eth1_deposit_index: u64,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
}

impl BeaconState {
    pub fn current_epoch(&self, slots_per_epoch: u64) -> Epoch {
        self.slot.epoch(slots_per_epoch)
    }

    pub fn canonical_root(&self) -> Hash256 {
        Hash256::from_slice(&self.tree_hash_root()[..])
    }
}
