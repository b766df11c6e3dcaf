use parking_lot::RwLock;
use std::collections::HashMap;
use tree_hash::TreeHash;
use types::{Attestation, AttestationData, Hash256, Slot};

/// Number of slots an attestation is retained in the pool before it is pruned, absorbing minor
/// skew between gossip arrival and the pool's own `prune` calls.
pub const SLOTS_RETAINED: usize = 3;

/// An aggregate is dropped once it covers this many distinct attesting indices; beyond this
/// point a full aggregate is assumed and further gossip duplicates are cheap to discard.
pub const MAX_ATTESTATIONS_PER_SLOT: usize = 16_384;

#[derive(Debug, PartialEq)]
pub enum Error {
    SlotTooLow { slot: Slot, lowest_permissible_slot: Slot },
    TooManyAttestations(usize),
    InconsistentBitfields,
}

#[derive(Debug, PartialEq)]
pub enum InsertOutcome {
    NewAttestationAggregate,
    SignatureAggregated { num_attestations: usize },
    AttestationAlreadyKnown,
}

/// Attestations for a single slot, grouped by `AttestationData` so that aggregation happens
/// in-place as duplicates of the same vote arrive from gossip.
#[derive(Default)]
struct AggregatedAttestationMap {
    map: HashMap<Hash256, Attestation>,
}

impl AggregatedAttestationMap {
    fn insert(&mut self, attestation: &Attestation) -> Result<InsertOutcome, Error> {
        let data_root = Hash256::from_slice(&attestation.data.tree_hash_root()[..]);

        match self.map.get_mut(&data_root) {
            Some(existing) => {
                let new_indices: Vec<u64> = attestation
                    .aggregation_bits
                    .iter()
                    .filter(|i| !existing.aggregation_bits.contains(i))
                    .copied()
                    .collect();

                if new_indices.is_empty() {
                    return Ok(InsertOutcome::AttestationAlreadyKnown);
                }

                existing.aggregate(attestation);
                Ok(InsertOutcome::SignatureAggregated {
                    num_attestations: existing.aggregation_bits.len(),
                })
            }
            None => {
                if self.map.len() >= MAX_ATTESTATIONS_PER_SLOT {
                    return Err(Error::TooManyAttestations(self.map.len()));
                }
                self.map.insert(data_root, attestation.clone());
                Ok(InsertOutcome::NewAttestationAggregate)
            }
        }
    }

    fn get(&self, data: &AttestationData) -> Option<Attestation> {
        let data_root = Hash256::from_slice(&data.tree_hash_root()[..]);
        self.map.get(&data_root).cloned()
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Aggregates unaggregated attestations arriving from gossip, grouped by slot, so an aggregator
/// can later publish a single `AggregateAndProof` per distinct vote instead of relaying every
/// individual attestation.
#[derive(Default)]
pub struct NaiveAggregationPool {
    maps: RwLock<HashMap<Slot, AggregatedAttestationMap>>,
}

impl NaiveAggregationPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        attestation: &Attestation,
        lowest_permissible_slot: Slot,
    ) -> Result<InsertOutcome, Error> {
        let slot = attestation.data.slot;

        if slot < lowest_permissible_slot {
            return Err(Error::SlotTooLow {
                slot,
                lowest_permissible_slot,
            });
        }

        self.maps
            .write()
            .entry(slot)
            .or_insert_with(AggregatedAttestationMap::default)
            .insert(attestation)
    }

    pub fn get_aggregate(&self, slot: Slot, data: &AttestationData) -> Option<Attestation> {
        self.maps.read().get(&slot)?.get(data)
    }

    pub fn num_attestations(&self) -> usize {
        self.maps.read().values().map(AggregatedAttestationMap::len).sum()
    }

    /// Drop every slot older than `current_slot - SLOTS_RETAINED`.
    pub fn prune(&self, current_slot: Slot) {
        let lowest_permissible_slot = Slot::new(
            current_slot
                .as_u64()
                .saturating_sub(SLOTS_RETAINED as u64),
        );
        self.maps
            .write()
            .retain(|&slot, _| slot >= lowest_permissible_slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{AttestationData, Checkpoint, Epoch};

    fn attestation(slot: u64, index: u64) -> Attestation {
        Attestation {
            aggregation_bits: vec![index],
            data: AttestationData {
                slot: Slot::new(slot),
                index: 0,
                beacon_block_root: Hash256::zero(),
                source: Checkpoint::new(Epoch::new(0), Hash256::zero()),
                target: Checkpoint::new(Epoch::new(0), Hash256::zero()),
            },
            signature: Default::default(),
        }
    }

    #[test]
    fn merges_duplicate_votes() {
        let pool = NaiveAggregationPool::new();
        let a = attestation(1, 0);
        let b = attestation(1, 1);

        assert_eq!(
            pool.insert(&a, Slot::new(0)).unwrap(),
            InsertOutcome::NewAttestationAggregate
        );
        assert_eq!(
            pool.insert(&b, Slot::new(0)).unwrap(),
            InsertOutcome::SignatureAggregated { num_attestations: 2 }
        );
        assert_eq!(pool.num_attestations(), 1);
    }

    #[test]
    fn prunes_old_slots() {
        let pool = NaiveAggregationPool::new();
        pool.insert(&attestation(1, 0), Slot::new(0)).unwrap();
        pool.insert(&attestation(10, 0), Slot::new(0)).unwrap();
        pool.prune(Slot::new(10));
        assert_eq!(pool.num_attestations(), 1);
    }
}
