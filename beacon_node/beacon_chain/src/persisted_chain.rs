//! The on-disk snapshot written under `ChainStore`'s well-known head key, letting
//! `BeaconChainBuilder::from_store` reconstruct a chain without replaying it from genesis.

use eth2_ssz::{Decode, Encode};
use ssz_derive::{Decode as SszDecode, Encode as SszEncode};
use fork_choice::PersistedForkChoice;
use store::{ChainStore, Error as StoreError, Store};
use types::{BeaconState, Checkpoint, Hash256, Slot};

/// Everything `BeaconChainBuilder::build` needs to reconstruct a `BeaconChain` other than the
/// `ChainSpec` and `Store` handle, which the caller already has.
#[derive(Clone, SszEncode, SszDecode)]
pub struct PersistedBeaconChain {
    pub genesis_state: BeaconState,
    pub genesis_block_root: Hash256,
    pub current_slot: Slot,
    pub justified_checkpoint: Checkpoint,
    pub best_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub fork_choice: PersistedForkChoice,
}

impl PersistedBeaconChain {
    pub fn load<S: Store>(chain_store: &ChainStore<S>) -> Result<Option<Self>, StoreError> {
        chain_store
            .load_persisted_head()?
            .map(|bytes| {
                Self::from_ssz_bytes(&bytes)
                    .map_err(|e| StoreError::SszDecodeError(format!("{:?}", e)))
            })
            .transpose()
    }

    pub fn store<S: Store>(&self, chain_store: &ChainStore<S>) -> Result<(), StoreError> {
        chain_store.persist_head(self.as_ssz_bytes())
    }
}
