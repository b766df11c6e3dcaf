use crate::metrics;
use crate::peer_id::PeerId;
use beacon_chain::BeaconChain;
use parking_lot::RwLock;
use slog::{debug, warn, Logger};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::Store;
use types::{BeaconState, Hash256, SignedBeaconBlock, Slot};

/// How long a missing-parent fetch is allowed to stay outstanding before it's abandoned (the
/// retry itself is the re-request a peer's later gossip or a resync will trigger).
const PARENT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, PartialEq)]
pub enum ProcessOutcome {
    Imported(Hash256),
    DeferredPending(Hash256),
    DeferredFuture(Slot),
    Rejected(String),
}

struct QueuedBlock {
    block: SignedBeaconBlock,
    state: BeaconState,
    #[allow(dead_code)]
    from: PeerId,
}

/// Buckets blocks whose parent isn't known yet or whose slot hasn't arrived, and tracks which
/// peer queued each one so a fetch-missing-parent worker knows who to ask. Pool fan-out on import
/// (attester/proposer slashings, voluntary exits) is handled inside `BeaconChain::process_block`
/// itself, so this manager only owns the queueing side of import.
pub struct BlockManager<S> {
    chain: Arc<BeaconChain<S>>,
    /// Keyed by the missing parent root.
    pending: RwLock<HashMap<Hash256, Vec<QueuedBlock>>>,
    /// Keyed by the slot the block belongs to.
    future: RwLock<HashMap<Slot, Vec<QueuedBlock>>>,
    /// Outstanding fetch-missing-parent requests, one per parent root, each carrying when it was
    /// first requested. One entry per root bounds how many concurrent parent fetches are ever
    /// outstanding, no matter how many blocks queue up behind it.
    fetching: RwLock<HashMap<Hash256, Instant>>,
    log: Logger,
}

impl<S> BlockManager<S>
where
    S: Store,
{
    pub fn new(chain: Arc<BeaconChain<S>>, log: Logger) -> Self {
        Self {
            chain,
            pending: RwLock::new(HashMap::new()),
            future: RwLock::new(HashMap::new()),
            fetching: RwLock::new(HashMap::new()),
            log,
        }
    }

    /// Abandons every outstanding parent fetch older than `PARENT_FETCH_TIMEOUT`, dropping the
    /// blocks that were waiting on it. Meant to be called once per slot, alongside `on_slot`.
    pub fn expire_stale_fetches(&self) {
        let now = Instant::now();
        let stale: Vec<Hash256> = self
            .fetching
            .read()
            .iter()
            .filter(|(_, requested_at)| now.duration_since(**requested_at) > PARENT_FETCH_TIMEOUT)
            .map(|(root, _)| *root)
            .collect();

        for parent_root in stale {
            self.fetching.write().remove(&parent_root);
            if let Some(blocks) = self.pending.write().remove(&parent_root) {
                warn!(
                    self.log,
                    "Abandoned blocks waiting on missing parent";
                    "parent_root" => ?parent_root,
                    "count" => blocks.len()
                );
            }
        }
    }

    /// Which parent roots currently need fetching from a peer. The sync service is responsible
    /// for issuing the actual request and for respecting its own concurrency bound.
    pub fn parents_to_fetch(&self) -> Vec<Hash256> {
        self.fetching.read().keys().copied().collect()
    }

    pub fn process(
        &self,
        current_slot: Slot,
        block: SignedBeaconBlock,
        state: BeaconState,
        from: PeerId,
    ) -> ProcessOutcome {
        if block.slot() > current_slot {
            let slot = block.slot();
            metrics::inc_counter(&metrics::BLOCKS_DEFERRED_FUTURE);
            self.future
                .write()
                .entry(slot)
                .or_default()
                .push(QueuedBlock { block, state, from });
            return ProcessOutcome::DeferredFuture(slot);
        }

        let parent_root = block.parent_root();
        if parent_root != Hash256::zero()
            && !self.chain.fork_choice.read().contains_block(&parent_root)
        {
            metrics::inc_counter(&metrics::BLOCKS_DEFERRED_PENDING);
            self.pending
                .write()
                .entry(parent_root)
                .or_default()
                .push(QueuedBlock { block, state, from });
            self.fetching
                .write()
                .entry(parent_root)
                .or_insert_with(Instant::now);
            return ProcessOutcome::DeferredPending(parent_root);
        }

        match self.chain.process_block(current_slot, block, state) {
            Ok(root) => {
                metrics::inc_counter(&metrics::BLOCKS_IMPORTED);
                self.flush_children(current_slot, root);
                ProcessOutcome::Imported(root)
            }
            Err(e) => {
                debug!(self.log, "Block rejected"; "reason" => format!("{:?}", e));
                metrics::inc_counter(&metrics::BLOCKS_REJECTED);
                ProcessOutcome::Rejected(format!("{:?}", e))
            }
        }
    }

    /// Re-attempts every block that was queued on `root`, now that it has been imported.
    fn flush_children(&self, current_slot: Slot, root: Hash256) {
        self.fetching.write().remove(&root);
        let waiting = self.pending.write().remove(&root).unwrap_or_default();
        for queued in waiting {
            self.process(current_slot, queued.block, queued.state, queued.from);
        }
    }

    /// Re-attempts every block that was queued on `current_slot` arriving.
    pub fn on_slot(&self, current_slot: Slot) {
        let ready = self.future.write().remove(&current_slot).unwrap_or_default();
        for queued in ready {
            self.process(current_slot, queued.block, queued.state, queued.from);
        }
    }

    pub fn num_pending(&self) -> usize {
        self.pending.read().values().map(Vec::len).sum()
    }

    pub fn num_future(&self) -> usize {
        self.future.read().values().map(Vec::len).sum()
    }

    /// Abandons any queued block whose slot the finalized checkpoint has already passed.
    pub fn prune_finalized(&self, finalized_slot: Slot) {
        let mut surviving_parents = std::collections::HashSet::new();
        self.pending.write().retain(|parent_root, blocks| {
            blocks.retain(|b| b.block.slot() > finalized_slot);
            let keep = !blocks.is_empty();
            if keep {
                surviving_parents.insert(*parent_root);
            }
            keep
        });
        self.fetching
            .write()
            .retain(|parent_root, _| surviving_parents.contains(parent_root));
        self.future.write().retain(|slot, _| *slot > finalized_slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_chain::BeaconChainBuilder;
    use store::MemoryStore;
    use types::{BeaconBlock, ChainSpec, SignedBeaconBlock};

    #[test]
    fn outcomes_are_distinguishable() {
        assert_ne!(
            ProcessOutcome::Imported(Hash256::zero()),
            ProcessOutcome::DeferredFuture(Slot::new(0))
        );
    }

    fn test_manager() -> BlockManager<MemoryStore> {
        let log = slog::Logger::root(slog::Discard, slog::o!());
        let chain = BeaconChainBuilder::quick_start(1000, ChainSpec::mainnet(), log.clone())
            .build(Arc::new(MemoryStore::default()))
            .expect("genesis build always succeeds");
        BlockManager::new(Arc::new(chain), log)
    }

    fn child_block(parent_root: Hash256, slot: u64) -> SignedBeaconBlock {
        SignedBeaconBlock {
            message: BeaconBlock {
                slot: Slot::new(slot),
                parent_root,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    // Scenario S4: a block whose parent isn't known yet is bucketed as pending and re-processed
    // (and imported) the moment its parent arrives and is itself imported.
    #[test]
    fn s4_pending_block_flushes_on_parent_import() {
        let manager = test_manager();
        let genesis_root = manager.chain.genesis_block_root;

        let parent = child_block(genesis_root, 1);
        let parent_root = parent.canonical_root();
        let child = child_block(parent_root, 2);
        let child_root = child.canonical_root();

        let outcome = manager.process(
            Slot::new(2),
            child,
            BeaconState::default(),
            PeerId::new("peer-a"),
        );
        assert_eq!(outcome, ProcessOutcome::DeferredPending(parent_root));
        assert_eq!(manager.num_pending(), 1);
        assert_eq!(manager.parents_to_fetch(), vec![parent_root]);

        let outcome = manager.process(
            Slot::new(1),
            parent,
            BeaconState::default(),
            PeerId::new("peer-b"),
        );
        assert_eq!(outcome, ProcessOutcome::Imported(parent_root));

        // Flushing the child happens synchronously inside `process`'s call to `flush_children`.
        assert_eq!(manager.num_pending(), 0);
        assert!(manager.parents_to_fetch().is_empty());
        assert!(manager
            .chain
            .fork_choice
            .read()
            .contains_block(&child_root));
    }

    // Scenario S5: pruning against a finalized slot drops queued blocks and their outstanding
    // parent-fetch bookkeeping, but leaves blocks above the finalized slot untouched.
    #[test]
    fn s5_prune_finalized_drops_superseded_queues() {
        let manager = test_manager();
        let genesis_root = manager.chain.genesis_block_root;

        let stale_parent = Hash256::from_low_u64_be(1);
        let stale_child = child_block(stale_parent, 5);
        manager.process(
            Slot::new(5),
            stale_child,
            BeaconState::default(),
            PeerId::new("peer-a"),
        );

        let fresh_parent = Hash256::from_low_u64_be(2);
        let fresh_child = child_block(fresh_parent, 100);
        manager.process(
            Slot::new(100),
            fresh_child,
            BeaconState::default(),
            PeerId::new("peer-b"),
        );

        let future_block = child_block(genesis_root, 200);
        manager.process(
            Slot::new(1),
            future_block,
            BeaconState::default(),
            PeerId::new("peer-c"),
        );

        assert_eq!(manager.num_pending(), 2);
        assert_eq!(manager.num_future(), 1);

        manager.prune_finalized(Slot::new(10));

        assert_eq!(manager.num_pending(), 1);
        assert_eq!(manager.parents_to_fetch(), vec![fresh_parent]);
        assert_eq!(manager.num_future(), 1);
    }
}
