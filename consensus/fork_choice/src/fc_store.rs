use types::{BeaconBlock, BeaconState, Checkpoint, Hash256, Slot};

/// The storage backing `ForkChoice`. Implementors persist the justified/finalized checkpoints and
/// the current slot, and know how to resolve ancestry queries against a `BeaconState`.
pub trait ForkChoiceStore: Sized {
    type Error: std::fmt::Debug;

    fn get_current_slot(&self) -> Slot;

    fn set_current_slot(&mut self, slot: Slot);

    fn justified_checkpoint(&self) -> &Checkpoint;

    fn justified_balances(&self) -> &[u64];

    fn best_justified_checkpoint(&self) -> &Checkpoint;

    fn finalized_checkpoint(&self) -> &Checkpoint;

    fn set_finalized_checkpoint(&mut self, checkpoint: Checkpoint);

    fn set_justified_checkpoint(&mut self, state: &BeaconState) -> Result<(), Self::Error>;

    fn set_best_justified_checkpoint(&mut self, state: &BeaconState);

    fn set_justified_checkpoint_to_best_justified_checkpoint(&mut self) -> Result<(), Self::Error>;

    /// Returns the ancestor of the block identified by `block_root` at `ancestor_slot`, given a
    /// `state` whose root matches that block.
    fn ancestor_at_slot(
        &self,
        state: &BeaconState,
        block_root: Hash256,
        ancestor_slot: Slot,
    ) -> Result<Hash256, Self::Error>;

    /// Called after a block has been accepted into fork choice, so the store can update any
    /// bookkeeping (e.g. balances used for the next `find_head`) derived from `state`.
    fn after_block(
        &mut self,
        block: &BeaconBlock,
        block_root: Hash256,
        state: &BeaconState,
    ) -> Result<(), Self::Error>;
}
