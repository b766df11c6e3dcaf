use crate::{Epoch, Hash256};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Identifies the first block of an epoch (or an earlier block, if the epoch-boundary slot was
/// empty).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
    TreeHash,
)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Hash256,
}

impl Checkpoint {
    pub const fn new(epoch: Epoch, root: Hash256) -> Self {
        Self { epoch, root }
    }

    pub fn epoch_start_slot(&self, slots_per_epoch: u64) -> crate::Slot {
        self.epoch.start_slot(slots_per_epoch)
    }
}
