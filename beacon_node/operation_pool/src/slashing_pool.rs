use parking_lot::RwLock;
use std::collections::HashMap;
use types::{AttesterSlashing, ProposerSlashing};

/// Proposer slashings are rare and cheap to check against one another, so the pool simply keys
/// each by the slashed proposer's validator index and keeps the first one seen.
#[derive(Default)]
pub struct ProposerSlashingPool {
    by_proposer: RwLock<HashMap<u64, ProposerSlashing>>,
}

impl ProposerSlashingPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, slashing: ProposerSlashing) {
        self.by_proposer
            .write()
            .entry(slashing.proposer_index())
            .or_insert(slashing);
    }

    pub fn get_slashings(&self) -> Vec<ProposerSlashing> {
        self.by_proposer.read().values().cloned().collect()
    }

    /// Drop slashings for validators already slashed by an imported block.
    pub fn remove_proposer_slashings(&self, slashed_validators: &[u64]) {
        let mut map = self.by_proposer.write();
        for validator_index in slashed_validators {
            map.remove(validator_index);
        }
    }

    pub fn num_slashings(&self) -> usize {
        self.by_proposer.read().len()
    }
}

/// Keyed by the lowest slashable validator index in the pair, which is sufficient to de-duplicate
/// slashings reported by multiple peers for the same incident.
#[derive(Default)]
pub struct AttesterSlashingPool {
    by_key: RwLock<HashMap<u64, AttesterSlashing>>,
}

impl AttesterSlashingPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, slashing: AttesterSlashing) {
        if let Some(&key) = slashing.slashable_indices().first() {
            self.by_key.write().entry(key).or_insert(slashing);
        }
    }

    pub fn get_slashings(&self) -> Vec<AttesterSlashing> {
        self.by_key.read().values().cloned().collect()
    }

    pub fn remove_attester_slashings(&self, slashed_validators: &[u64]) {
        let mut map = self.by_key.write();
        map.retain(|key, _| !slashed_validators.contains(key));
    }

    pub fn num_slashings(&self) -> usize {
        self.by_key.read().len()
    }
}
