use parking_lot::RwLock;
use std::collections::HashMap;
use tree_hash::TreeHash;
use types::{Attestation, AttestationData, BeaconState, ChainSpec, Hash256, Slot};

/// How many slots an attestation is retained for after it stops being eligible for inclusion in
/// a block, to absorb minor clock skew between the pool's pruning calls and the caller's.
pub const SLOTS_RETAINED: u64 = 3;

#[derive(Debug, PartialEq)]
pub enum Error {
    /// Attempted to aggregate two attestations with different `AttestationData`.
    DataMismatch,
}

/// Pools unaggregated and aggregated attestations by their `AttestationData` root, merging
/// attestations that attest to the same data as they arrive.
///
/// Grounded on the same "merge-on-insert, prune-by-slot" shape as a naive aggregation cache: each
/// distinct vote accumulates attesters until a block includes it or it ages out.
#[derive(Default)]
pub struct AttestationPool {
    by_data_root: RwLock<HashMap<Hash256, Attestation>>,
}

impl AttestationPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `attestation`, merging it into any existing attestation with the same data.
    pub fn insert(&self, attestation: Attestation) -> Result<(), Error> {
        let root = attestation_data_root(&attestation.data);
        let mut map = self.by_data_root.write();

        match map.get_mut(&root) {
            Some(existing) => existing.aggregate(&attestation),
            None => {
                map.insert(root, attestation);
            }
        }

        Ok(())
    }

    /// One attestation per distinct `AttestationData` currently known, for inclusion in a block
    /// proposed atop `state`. A full implementation would further cap the block's total
    /// attestation count and pick the highest-value subset; re-implementing the state-transition
    /// function that would validate that subset is out of scope, so every known attestation whose
    /// data's target epoch is not in the future is offered.
    pub fn get_attestations(&self, state: &BeaconState, spec: &ChainSpec) -> Vec<Attestation> {
        let current_epoch = state.current_epoch(spec.slots_per_epoch);
        self.by_data_root
            .read()
            .values()
            .filter(|a| a.data.target.epoch <= current_epoch)
            .cloned()
            .collect()
    }

    /// Drop attestations whose target epoch is more than `SLOTS_RETAINED` slots stale relative to
    /// `current_slot`.
    pub fn prune(&self, current_slot: Slot, spec: &ChainSpec) {
        let cutoff = current_slot.epoch(spec.slots_per_epoch) - (SLOTS_RETAINED / spec.slots_per_epoch).max(1);
        self.by_data_root
            .write()
            .retain(|_, a| a.data.target.epoch + 1 >= cutoff);
    }

    /// Remove every attestation included in a just-imported block so it isn't offered again.
    pub fn remove_attestations(&self, attestations: &[Attestation]) {
        let mut map = self.by_data_root.write();
        for a in attestations {
            map.remove(&attestation_data_root(&a.data));
        }
    }

    pub fn num_attestations(&self) -> usize {
        self.by_data_root.read().len()
    }
}

fn attestation_data_root(data: &AttestationData) -> Hash256 {
    Hash256::from_slice(&data.tree_hash_root()[..])
}
