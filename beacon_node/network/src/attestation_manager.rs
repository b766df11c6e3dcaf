use crate::metrics;
use beacon_chain::{BeaconChain, BeaconChainError};
use parking_lot::RwLock;
use slog::{debug, Logger};
use std::collections::HashMap;
use std::sync::Arc;
use store::Store;
use types::{Attestation, Epoch, Hash256, Slot};

/// The outcome of handing an attestation to the manager, grounded on the
/// Accept / Defer(Pending|Future) / Reject(reason) processor shape.
#[derive(Debug, PartialEq)]
pub enum ProcessOutcome {
    Accept,
    DeferredPending(Hash256),
    DeferredFuture(Slot),
    Rejected(String),
}

/// Buckets unaggregated/aggregated attestations whose referenced block or slot isn't yet
/// actionable, flushing them as the store/clock catch up.
pub struct AttestationManager<S> {
    chain: Arc<BeaconChain<S>>,
    /// Keyed by the missing `beacon_block_root`.
    pending: RwLock<HashMap<Hash256, Vec<Attestation>>>,
    /// Keyed by the slot at which the attestation becomes processable.
    future: RwLock<HashMap<Slot, Vec<Attestation>>>,
    log: Logger,
}

impl<S> AttestationManager<S>
where
    S: Store,
{
    pub fn new(chain: Arc<BeaconChain<S>>, log: Logger) -> Self {
        Self {
            chain,
            pending: RwLock::new(HashMap::new()),
            future: RwLock::new(HashMap::new()),
            log,
        }
    }

    /// Processes a single attestation arriving from gossip or from a just-imported block.
    pub fn process(&self, current_slot: Slot, attestation: Attestation) -> ProcessOutcome {
        if attestation.data.slot > current_slot {
            let slot = attestation.data.slot;
            self.future.write().entry(slot).or_default().push(attestation);
            metrics::inc_counter(&metrics::ATTESTATIONS_DEFERRED_FUTURE);
            return ProcessOutcome::DeferredFuture(slot);
        }

        let beacon_block_root = attestation.data.beacon_block_root;
        if beacon_block_root != Hash256::zero()
            && !self.chain.fork_choice.read().contains_block(&beacon_block_root)
        {
            self.pending
                .write()
                .entry(beacon_block_root)
                .or_default()
                .push(attestation);
            metrics::inc_counter(&metrics::ATTESTATIONS_DEFERRED_PENDING);
            return ProcessOutcome::DeferredPending(beacon_block_root);
        }

        match self.chain.process_attestation(current_slot, &attestation) {
            Ok(()) => {
                metrics::inc_counter(&metrics::ATTESTATIONS_ACCEPTED);
                ProcessOutcome::Accept
            }
            Err(BeaconChainError::FutureSlot) => {
                let slot = attestation.data.slot;
                self.future.write().entry(slot).or_default().push(attestation);
                ProcessOutcome::DeferredFuture(slot)
            }
            Err(e) => {
                debug!(self.log, "Attestation rejected"; "reason" => format!("{:?}", e));
                metrics::inc_counter(&metrics::ATTESTATIONS_REJECTED);
                ProcessOutcome::Rejected(format!("{:?}", e))
            }
        }
    }

    /// Flushes every attestation pending on `root`, now that a block with that root has been
    /// imported. Returns how many were (re-)accepted.
    pub fn on_block_imported(&self, current_slot: Slot, root: Hash256) -> usize {
        let deferred = self.pending.write().remove(&root).unwrap_or_default();
        let mut accepted = 0;
        for attestation in deferred {
            if self.process(current_slot, attestation) == ProcessOutcome::Accept {
                accepted += 1;
            }
        }
        accepted
    }

    /// Flushes every attestation that was waiting on `node_slot` reaching its slot.
    pub fn on_slot(&self, current_slot: Slot) {
        let deferred = self.future.write().remove(&current_slot).unwrap_or_default();
        for attestation in deferred {
            self.process(current_slot, attestation);
        }
    }

    /// Drops pending attestations whose target epoch has been superseded by finality.
    pub fn on_finalized_checkpoint(&self, finalized_epoch: Epoch) {
        self.pending.write().retain(|_, attestations| {
            attestations.retain(|a| a.data.target.epoch >= finalized_epoch);
            !attestations.is_empty()
        });
    }

    pub fn num_pending(&self) -> usize {
        self.pending.read().values().map(Vec::len).sum()
    }

    pub fn num_future(&self) -> usize {
        self.future.read().values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_chain::BeaconChainBuilder;
    use store::MemoryStore;
    use types::{
        AttestationData, BeaconBlock, BeaconState, ChainSpec, Checkpoint, SignedBeaconBlock,
    };

    #[test]
    fn outcomes_are_distinguishable() {
        assert_ne!(ProcessOutcome::Accept, ProcessOutcome::DeferredFuture(Slot::new(1)));
    }

    fn test_manager() -> AttestationManager<MemoryStore> {
        let log = slog::Logger::root(slog::Discard, slog::o!());
        let chain = BeaconChainBuilder::quick_start(1000, ChainSpec::mainnet(), log.clone())
            .build(Arc::new(MemoryStore::default()))
            .expect("genesis build always succeeds");
        AttestationManager::new(Arc::new(chain), log)
    }

    // Scenario S4: an attestation referencing a not-yet-known block root is bucketed as pending
    // and flushed (and accepted) the moment that block is imported.
    #[test]
    fn s4_pending_attestation_flushes_on_block_import() {
        let manager = test_manager();
        let genesis_root = manager.chain.genesis_block_root;

        let block = SignedBeaconBlock {
            message: BeaconBlock {
                slot: Slot::new(1),
                parent_root: genesis_root,
                ..Default::default()
            },
            ..Default::default()
        };
        let block_root = block.canonical_root();

        let attestation = Attestation {
            aggregation_bits: vec![0],
            data: AttestationData {
                slot: Slot::new(1),
                index: 0,
                beacon_block_root: block_root,
                source: Checkpoint::default(),
                target: Checkpoint::default(),
            },
            signature: Default::default(),
        };

        let outcome = manager.process(Slot::new(1), attestation);
        assert_eq!(outcome, ProcessOutcome::DeferredPending(block_root));
        assert_eq!(manager.num_pending(), 1);

        manager
            .chain
            .process_block(Slot::new(1), block, BeaconState::default())
            .expect("genesis child imports cleanly");
        let accepted = manager.on_block_imported(Slot::new(1), block_root);

        assert_eq!(accepted, 1);
        assert_eq!(manager.num_pending(), 0);
    }
}
