use crate::ForkChoiceStore;
use proto_array::{Block as ProtoBlock, ProtoArrayForkChoice};
use ssz_derive::{Decode, Encode};
use types::{BeaconBlock, BeaconState, ChainSpec, Epoch, Hash256, IndexedAttestation, Slot};

#[derive(Debug)]
pub enum Error<T> {
    InvalidAttestation(InvalidAttestation),
    InvalidBlock(InvalidBlock),
    ProtoArrayError(String),
    InvalidProtoArrayBytes(String),
    MissingProtoArrayBlock(Hash256),
    InconsistentOnTick { previous_slot: Slot, time: Slot },
    ForkChoiceStoreError(T),
    UnableToSetJustifiedCheckpoint(T),
    AfterBlockFailed(T),
}

impl<T> From<InvalidAttestation> for Error<T> {
    fn from(e: InvalidAttestation) -> Self {
        Error::InvalidAttestation(e)
    }
}

impl<T> From<String> for Error<T> {
    fn from(e: String) -> Self {
        Error::ProtoArrayError(e)
    }
}

#[derive(Debug)]
pub enum InvalidBlock {
    /// The block slot is greater than the present slot.
    FutureSlot {
        present_slot: Slot,
        block_slot: Slot,
    },
}

#[derive(Debug)]
pub enum InvalidAttestation {
    /// The attestation's `attesting_indices` were empty when they shouldn't be.
    EmptyAttestingIndices,
    /// The `attestation.data.beacon_block_root` block is unknown.
    UnknownHeadBlock { beacon_block_root: Hash256 },
    /// `attestation.data.slot` is not in the same epoch as `data.target.epoch`.
    BadTargetEpoch,
    /// The target root of the attestation points to a block we have not verified.
    UnknownTargetRoot(Hash256),
    /// The attestation is for an epoch in the future (w.r.t. the gossip clock disparity).
    FutureEpoch {
        attestation_epoch: Epoch,
        current_epoch: Epoch,
    },
    /// The attestation is for an epoch in the past (w.r.t. the gossip clock disparity).
    PastEpoch {
        attestation_epoch: Epoch,
        current_epoch: Epoch,
    },
    /// The attestation's target root does not match what fork choice has stored for that block.
    InvalidTarget { attestation: Hash256, block: Hash256 },
    /// The attestation attests to a slot later than the block it references.
    AttestsToFutureBlock { block: Slot, attestation: Slot },
}

/// How far `slot` lies from the start of its epoch.
///
/// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#compute_slots_since_epoch_start
pub fn compute_slots_since_epoch_start(slot: Slot, slots_per_epoch: u64) -> Slot {
    slot - slot.epoch(slots_per_epoch).start_slot(slots_per_epoch)
}

/// The first slot in `epoch`.
///
/// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/beacon-chain.md#compute_start_slot_at_epoch
fn compute_start_slot_at_epoch(epoch: Epoch, slots_per_epoch: u64) -> Slot {
    epoch.start_slot(slots_per_epoch)
}

/// Called whenever the current time increases.
///
/// Must only ever be passed a `time` that is less than, equal to, or one greater than the
/// previously passed value -- call once per slot increment.
///
/// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#on_tick
fn on_tick<T>(
    store: &mut T,
    time: Slot,
    spec: &ChainSpec,
) -> Result<(), Error<T::Error>>
where
    T: ForkChoiceStore,
{
    let previous_slot = store.get_current_slot();

    if time > previous_slot + 1 {
        return Err(Error::InconsistentOnTick {
            previous_slot,
            time,
        });
    }

    store.set_current_slot(time);

    let current_slot = store.get_current_slot();
    if !(current_slot > previous_slot
        && compute_slots_since_epoch_start(current_slot, spec.slots_per_epoch).as_u64() == 0)
    {
        return Ok(());
    }

    if store.best_justified_checkpoint().epoch > store.justified_checkpoint().epoch {
        store
            .set_justified_checkpoint_to_best_justified_checkpoint()
            .map_err(Error::ForkChoiceStoreError)?;
    }

    Ok(())
}

/// Queued attestations from the current slot, held back until their slot is in the past.
#[derive(Clone, PartialEq, Encode, Decode)]
pub struct QueuedAttestation {
    slot: Slot,
    attesting_indices: Vec<u64>,
    block_root: Hash256,
    target_epoch: Epoch,
}

impl From<&IndexedAttestation> for QueuedAttestation {
    fn from(a: &IndexedAttestation) -> Self {
        Self {
            slot: a.data.slot,
            attesting_indices: a.attesting_indices.clone(),
            block_root: a.data.beacon_block_root,
            target_epoch: a.data.target.epoch,
        }
    }
}

/// Returns and removes all values in `queued_attestations` with a slot earlier than
/// `current_slot`.
fn dequeue_attestations(
    current_slot: Slot,
    queued_attestations: &mut Vec<QueuedAttestation>,
) -> Vec<QueuedAttestation> {
    let remaining = queued_attestations.split_off(
        queued_attestations
            .iter()
            .position(|a| a.slot >= current_slot)
            .unwrap_or(queued_attestations.len()),
    );

    std::mem::replace(queued_attestations, remaining)
}

/// Implements "Ethereum 2.0 Phase 0 -- Beacon Chain Fork Choice":
///
/// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md
///
/// Wraps `ProtoArrayForkChoice`, adding management of the justified state, caching of balances,
/// and queuing of attestations from the current slot. Protocol constants are read from an
/// explicit `&ChainSpec` passed to each call rather than carried as a generic type parameter.
pub struct ForkChoice<T> {
    fc_store: T,
    proto_array: ProtoArrayForkChoice,
    /// Resolves the `0x00..00` alias back to genesis. Need not be the _actual_ genesis root --
    /// it suffices to be the finalized root at construction time.
    genesis_block_root: Hash256,
    queued_attestations: Vec<QueuedAttestation>,
}

impl<T> PartialEq for ForkChoice<T>
where
    T: ForkChoiceStore + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.fc_store == other.fc_store
            && self.proto_array == other.proto_array
            && self.genesis_block_root == other.genesis_block_root
            && self.queued_attestations == other.queued_attestations
    }
}

impl<T> ForkChoice<T>
where
    T: ForkChoiceStore,
{
    pub fn from_genesis(
        fc_store: T,
        genesis_block_root: Hash256,
        genesis_block: &BeaconBlock,
        genesis_state: &BeaconState,
        spec: &ChainSpec,
    ) -> Result<Self, Error<T::Error>> {
        let finalized_block_slot = genesis_block.slot;
        let finalized_block_state_root = genesis_block.state_root;
        let justified_epoch = genesis_state.current_epoch(spec.slots_per_epoch);
        let finalized_epoch = justified_epoch;
        let finalized_root = genesis_block_root;

        let proto_array = ProtoArrayForkChoice::new(
            finalized_block_slot,
            finalized_block_state_root,
            justified_epoch,
            finalized_epoch,
            finalized_root,
        )?;

        Ok(Self {
            fc_store,
            proto_array,
            genesis_block_root,
            queued_attestations: vec![],
        })
    }

    /// Instantiates `Self` from components loaded from disk after a process restart.
    pub fn from_components(
        fc_store: T,
        proto_array: ProtoArrayForkChoice,
        genesis_block_root: Hash256,
        queued_attestations: Vec<QueuedAttestation>,
    ) -> Self {
        Self {
            fc_store,
            proto_array,
            genesis_block_root,
            queued_attestations,
        }
    }

    /// The ancestor of `block_root` at `ancestor_slot`. (`ancestor_slot` refers to the slot of the
    /// block *returned*, not the one supplied.)
    ///
    /// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#get_ancestor
    fn get_ancestor(
        &self,
        state: &BeaconState,
        block_root: Hash256,
        ancestor_slot: Slot,
    ) -> Result<Hash256, Error<T::Error>> {
        let block = self
            .proto_array
            .get_block(&block_root)
            .ok_or(Error::MissingProtoArrayBlock(block_root))?;

        if block.slot > ancestor_slot {
            self.fc_store
                .ancestor_at_slot(state, block_root, ancestor_slot)
                .map_err(Error::ForkChoiceStoreError)
        } else {
            // Either an exact match, or `block_root` is already older than `ancestor_slot`
            // (a skip slot): return the most recent root prior to the queried slot.
            Ok(block_root)
        }
    }

    /// Run the fork choice rule to determine the head.
    ///
    /// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#get_head
    pub fn get_head(&mut self, current_slot: Slot, spec: &ChainSpec) -> Result<Hash256, Error<T::Error>> {
        self.update_time(current_slot, spec)?;

        let store = &mut self.fc_store;
        let genesis_block_root = self.genesis_block_root;

        let remove_alias = |root| {
            if root == Hash256::zero() {
                genesis_block_root
            } else {
                root
            }
        };

        self.proto_array
            .find_head(
                store.justified_checkpoint().epoch,
                remove_alias(store.justified_checkpoint().root),
                store.finalized_checkpoint().epoch,
                store.justified_balances(),
            )
            .map_err(Into::into)
    }

    /// Whether `store` should update `state.current_justified_checkpoint` to its own
    /// `justified_checkpoint`.
    ///
    /// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#should_update_justified_checkpoint
    fn should_update_justified_checkpoint(
        &mut self,
        current_slot: Slot,
        state: &BeaconState,
        spec: &ChainSpec,
    ) -> Result<bool, Error<T::Error>> {
        self.update_time(current_slot, spec)?;

        let new_justified_checkpoint = &state.current_justified_checkpoint;

        if compute_slots_since_epoch_start(self.fc_store.get_current_slot(), spec.slots_per_epoch)
            .as_u64()
            < spec.safe_slots_to_update_justified
        {
            return Ok(true);
        }

        let justified_slot =
            compute_start_slot_at_epoch(self.fc_store.justified_checkpoint().epoch, spec.slots_per_epoch);
        if self.get_ancestor(state, new_justified_checkpoint.root, justified_slot)?
            != self.fc_store.justified_checkpoint().root
        {
            return Ok(false);
        }

        Ok(true)
    }

    /// Add `block` to the fork choice DAG. `block_root` is the root of `block`, and `state` is
    /// the post-state reached by applying it (`state`'s root matches `block.state_root`).
    ///
    /// Approximates (does not itself verify) `on_block`:
    /// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#on_block
    ///
    /// Verification of `block` is assumed to have already been completed by the caller.
    pub fn on_block(
        &mut self,
        current_slot: Slot,
        block: &BeaconBlock,
        block_root: Hash256,
        state: &BeaconState,
        spec: &ChainSpec,
    ) -> Result<(), Error<T::Error>> {
        let current_slot = self.update_time(current_slot, spec)?;

        // Blocks cannot be in the future. We do not delay consideration of future blocks; they
        // are simply dropped.
        if block.slot > current_slot {
            return Err(Error::InvalidBlock(InvalidBlock::FutureSlot {
                present_slot: current_slot,
                block_slot: block.slot,
            }));
        }

        if state.current_justified_checkpoint.epoch > self.fc_store.justified_checkpoint().epoch {
            if state.current_justified_checkpoint.epoch
                > self.fc_store.best_justified_checkpoint().epoch
            {
                self.fc_store.set_best_justified_checkpoint(state);
            }
            if self.should_update_justified_checkpoint(current_slot, state, spec)? {
                self.fc_store
                    .set_justified_checkpoint(state)
                    .map_err(Error::UnableToSetJustifiedCheckpoint)?;
            }
        }

        if state.finalized_checkpoint.epoch > self.fc_store.finalized_checkpoint().epoch {
            self.fc_store
                .set_finalized_checkpoint(state.finalized_checkpoint);
            let finalized_slot = compute_start_slot_at_epoch(
                self.fc_store.finalized_checkpoint().epoch,
                spec.slots_per_epoch,
            );

            if state.current_justified_checkpoint.epoch > self.fc_store.justified_checkpoint().epoch
                || self.get_ancestor(
                    state,
                    self.fc_store.justified_checkpoint().root,
                    finalized_slot,
                )? != self.fc_store.finalized_checkpoint().root
            {
                self.fc_store
                    .set_justified_checkpoint(state)
                    .map_err(Error::UnableToSetJustifiedCheckpoint)?;
            }
        }

        let target_slot = block.slot.epoch(spec.slots_per_epoch).start_slot(spec.slots_per_epoch);
        let target_root = if block.slot == target_slot {
            block_root
        } else {
            self.get_ancestor(state, block_root, target_slot)?
        };

        // Makes fork choice aware of the block so it can be identified as the head even before
        // it accrues any votes; does not itself apply a vote.
        self.proto_array.process_block(ProtoBlock {
            slot: block.slot,
            root: block_root,
            parent_root: Some(block.parent_root),
            target_root,
            state_root: block.state_root,
            justified_epoch: state.current_justified_checkpoint.epoch,
            finalized_epoch: state.finalized_checkpoint.epoch,
        })?;

        self.fc_store
            .after_block(block, block_root, state)
            .map_err(Error::AfterBlockFailed)?;

        Ok(())
    }

    fn validate_on_attestation(
        &self,
        indexed_attestation: &IndexedAttestation,
        spec: &ChainSpec,
    ) -> Result<(), InvalidAttestation> {
        // No point processing an attestation with no attesting indices; reject it up-front to
        // avoid wasting resources verifying the rest of it.
        if indexed_attestation.attesting_indices.is_empty() {
            return Err(InvalidAttestation::EmptyAttestingIndices);
        }

        let slot_now = self.fc_store.get_current_slot();
        let epoch_now = slot_now.epoch(spec.slots_per_epoch);
        let target = indexed_attestation.data.target;

        if target.epoch > epoch_now {
            return Err(InvalidAttestation::FutureEpoch {
                attestation_epoch: target.epoch,
                current_epoch: epoch_now,
            });
        } else if target.epoch + 1 < epoch_now {
            return Err(InvalidAttestation::PastEpoch {
                attestation_epoch: target.epoch,
                current_epoch: epoch_now,
            });
        }

        if target.epoch != indexed_attestation.data.slot.epoch(spec.slots_per_epoch) {
            return Err(InvalidAttestation::BadTargetEpoch);
        }

        if !self.proto_array.contains_block(&target.root) {
            return Err(InvalidAttestation::UnknownTargetRoot(target.root));
        }

        // Indirectly checks that `attestation.data.beacon_block_root` is known to fork choice:
        // any known, non-finalized block should be present here, so this filters out
        // attestations to blocks we have not processed.
        let block = self
            .proto_array
            .get_block(&indexed_attestation.data.beacon_block_root)
            .ok_or(InvalidAttestation::UnknownHeadBlock {
                beacon_block_root: indexed_attestation.data.beacon_block_root,
            })?;

        if block.target_root != target.root {
            return Err(InvalidAttestation::InvalidTarget {
                attestation: target.root,
                block: block.target_root,
            });
        }

        if block.slot > indexed_attestation.data.slot {
            return Err(InvalidAttestation::AttestsToFutureBlock {
                block: block.slot,
                attestation: indexed_attestation.data.slot,
            });
        }

        Ok(())
    }

    /// Register `attestation` with the fork choice DAG so it influences future `get_head` calls.
    ///
    /// Approximates (does not itself verify) `on_attestation`:
    /// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#on_attestation
    pub fn on_attestation(
        &mut self,
        current_slot: Slot,
        attestation: &IndexedAttestation,
        spec: &ChainSpec,
    ) -> Result<(), Error<T::Error>> {
        self.update_time(current_slot, spec)?;

        // Attesters who have never seen a block attest to the zero hash, an alias for genesis.
        // Votes to the zero hash are not useful -- every validator implicitly attests to genesis
        // just by being present -- so they are dropped rather than applied.
        if attestation.data.beacon_block_root == Hash256::zero() {
            return Ok(());
        }

        self.validate_on_attestation(attestation, spec)?;

        if attestation.data.slot < self.fc_store.get_current_slot() {
            for validator_index in &attestation.attesting_indices {
                self.proto_array.process_attestation(
                    *validator_index as usize,
                    attestation.data.beacon_block_root,
                    attestation.data.target.epoch,
                )?;
            }
        } else {
            // "Attestations can only affect the fork choice of subsequent slots. Delay
            // consideration in the fork choice until their slot is in the past."
            self.queued_attestations
                .push(QueuedAttestation::from(attestation));
        }

        Ok(())
    }

    /// Calls `on_tick` for every slot between the store's current slot and `current_slot`.
    /// Returns the store's current slot afterward.
    pub fn update_time(&mut self, current_slot: Slot, spec: &ChainSpec) -> Result<Slot, Error<T::Error>> {
        while self.fc_store.get_current_slot() < current_slot {
            let previous_slot = self.fc_store.get_current_slot();
            on_tick(&mut self.fc_store, previous_slot + 1, spec)?
        }

        self.process_attestation_queue(spec)?;

        Ok(self.fc_store.get_current_slot())
    }

    /// Processes and removes queued attestations that are now eligible due to the clock advancing.
    fn process_attestation_queue(&mut self, _spec: &ChainSpec) -> Result<(), Error<T::Error>> {
        for attestation in dequeue_attestations(
            self.fc_store.get_current_slot(),
            &mut self.queued_attestations,
        ) {
            for validator_index in &attestation.attesting_indices {
                self.proto_array.process_attestation(
                    *validator_index as usize,
                    attestation.block_root,
                    attestation.target_epoch,
                )?;
            }
        }

        Ok(())
    }

    pub fn contains_block(&self, block_root: &Hash256) -> bool {
        self.proto_array.contains_block(block_root)
    }

    pub fn get_block(&self, block_root: &Hash256) -> Option<ProtoBlock> {
        self.proto_array.get_block(block_root)
    }

    /// The latest message for a validator, if any: `(block_root, target_epoch)`.
    ///
    /// Calling `Self::update_time` first is prudent since some attestations may be queued and
    /// awaiting processing.
    pub fn latest_message(&self, validator_index: usize) -> Option<(Hash256, Epoch)> {
        self.proto_array.latest_message(validator_index)
    }

    pub fn proto_array(&self) -> &ProtoArrayForkChoice {
        &self.proto_array
    }

    pub fn fc_store(&self) -> &T {
        &self.fc_store
    }

    pub fn genesis_block_root(&self) -> &Hash256 {
        &self.genesis_block_root
    }

    pub fn queued_attestations(&self) -> &[QueuedAttestation] {
        &self.queued_attestations
    }

    /// Prunes the underlying fork choice DAG back to the finalized root.
    pub fn prune(&mut self) -> Result<(), Error<T::Error>> {
        let finalized_root = self.fc_store.finalized_checkpoint().root;

        self.proto_array
            .maybe_prune(finalized_root)
            .map_err(Into::into)
    }

    /// Instantiates `Self` from a `PersistedForkChoice` produced by an earlier `to_persisted`.
    pub fn from_persisted(
        persisted: PersistedForkChoice,
        fc_store: T,
    ) -> Result<Self, Error<T::Error>> {
        let proto_array = ProtoArrayForkChoice::from_bytes(&persisted.proto_array_bytes)
            .map_err(Error::InvalidProtoArrayBytes)?;

        Ok(Self {
            fc_store,
            proto_array,
            genesis_block_root: persisted.genesis_block_root,
            queued_attestations: persisted.queued_attestations,
        })
    }

    /// Snapshots `Self` into a `PersistedForkChoice` so it can be reconstructed later.
    pub fn to_persisted(&self) -> PersistedForkChoice {
        PersistedForkChoice {
            proto_array_bytes: self.proto_array().as_bytes(),
            queued_attestations: self.queued_attestations().to_vec(),
            genesis_block_root: *self.genesis_block_root(),
        }
    }
}

/// Encodes/decodes the state of `ForkChoice` as SSZ bytes for persistence to the store.
#[derive(Encode, Decode, Clone)]
pub struct PersistedForkChoice {
    proto_array_bytes: Vec<u8>,
    queued_attestations: Vec<QueuedAttestation>,
    genesis_block_root: Hash256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_since_epoch_start() {
        let spec = ChainSpec::minimal();
        for epoch in 0..3 {
            for slot in 0..spec.slots_per_epoch {
                let input = epoch * spec.slots_per_epoch + slot;
                assert_eq!(
                    compute_slots_since_epoch_start(Slot::new(input), spec.slots_per_epoch).as_u64(),
                    slot
                )
            }
        }
    }

    #[test]
    fn start_slot_at_epoch() {
        let spec = ChainSpec::minimal();
        for epoch in 0..3 {
            assert_eq!(
                compute_start_slot_at_epoch(Epoch::new(epoch), spec.slots_per_epoch).as_u64(),
                epoch * spec.slots_per_epoch
            )
        }
    }

    fn get_queued_attestations() -> Vec<QueuedAttestation> {
        (1..4)
            .map(|i| QueuedAttestation {
                slot: Slot::new(i),
                attesting_indices: vec![],
                block_root: Hash256::zero(),
                target_epoch: Epoch::new(0),
            })
            .collect()
    }

    fn get_slots(queued_attestations: &[QueuedAttestation]) -> Vec<u64> {
        queued_attestations.iter().map(|a| a.slot.as_u64()).collect()
    }

    fn test_queued_attestations(current_time: Slot) -> (Vec<u64>, Vec<u64>) {
        let mut queued = get_queued_attestations();
        let dequeued = dequeue_attestations(current_time, &mut queued);

        (get_slots(&queued), get_slots(&dequeued))
    }

    #[test]
    fn dequeuing_attestations() {
        let (queued, dequeued) = test_queued_attestations(Slot::new(0));
        assert_eq!(queued, vec![1, 2, 3]);
        assert!(dequeued.is_empty());

        let (queued, dequeued) = test_queued_attestations(Slot::new(2));
        assert_eq!(queued, vec![2, 3]);
        assert_eq!(dequeued, vec![1]);

        let (queued, dequeued) = test_queued_attestations(Slot::new(4));
        assert!(queued.is_empty());
        assert_eq!(dequeued, vec![1, 2, 3]);
    }
}
