use parking_lot::RwLock;
use std::collections::HashMap;
use types::SignedVoluntaryExit;

/// Voluntary exits, keyed by the exiting validator's index so a later duplicate does not appear
/// twice in a proposed block.
#[derive(Default)]
pub struct ExitPool {
    by_validator: RwLock<HashMap<u64, SignedVoluntaryExit>>,
}

impl ExitPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, exit: SignedVoluntaryExit) {
        self.by_validator
            .write()
            .entry(exit.message.validator_index)
            .or_insert(exit);
    }

    pub fn get_voluntary_exits(&self) -> Vec<SignedVoluntaryExit> {
        self.by_validator.read().values().cloned().collect()
    }

    pub fn remove_voluntary_exits(&self, exited_validators: &[u64]) {
        let mut map = self.by_validator.write();
        for validator_index in exited_validators {
            map.remove(validator_index);
        }
    }

    pub fn num_exits(&self) -> usize {
        self.by_validator.read().len()
    }
}
