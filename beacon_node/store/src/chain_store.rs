//! The recent-chain store's startup and transactional-write protocol, layered on top of a plain
//! `Store`. `BeaconChain` owns one of these alongside its `Store` handle; `beacon_chain_builder.rs`
//! drives the startup sequence and `BeaconChain::process_block`/`on_slot` drive transactions.

use crate::{DBColumn, Error, Store};
use parking_lot::RwLock;
use slog::{debug, info, warn, Logger};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use types::{Checkpoint, Hash256};

const SUBSCRIPTION_CHANNEL_CAPACITY: usize = 16;
const STARTUP_RETRY_BASE_DELAY: Duration = Duration::from_millis(250);
const STARTUP_RETRY_MAX_DELAY: Duration = Duration::from_secs(16);

/// The fixed key the chain's persisted head snapshot (genesis info, checkpoints, fork-choice
/// bytes) is stored under. There is only ever one live chain per store, so a well-known key
/// stands in for a real "latest" pointer a disk-backed column family would expose.
pub const PERSISTED_HEAD_KEY: [u8; 32] = [0u8; 32];

#[derive(Debug)]
pub enum ChainStoreError {
    /// Raised when a caller attempts to install a genesis or loaded store over one that is
    /// already initialized -- an operator misconfiguration, not a retryable condition.
    AlreadyInitialized,
    Store(Error),
}

impl From<Error> for ChainStoreError {
    fn from(e: Error) -> Self {
        ChainStoreError::Store(e)
    }
}

/// Tracks, per persisted block/checkpoint-state root, the slot/epoch it belongs to, so a
/// finalization commit can compute the pruning set without re-walking the fork-choice DAG.
#[derive(Default)]
struct RootIndex {
    blocks_by_slot: BTreeMap<u64, Vec<Hash256>>,
    checkpoint_states_by_epoch: BTreeMap<u64, Vec<Hash256>>,
}

/// The startup/transaction/subscription surface in front of a `Store`.
pub struct ChainStore<S> {
    store: Arc<S>,
    initialized: RwLock<bool>,
    index: RwLock<RootIndex>,
    store_initialized_tx: broadcast::Sender<()>,
    best_block_initialized_tx: broadcast::Sender<Hash256>,
    finalized_checkpoint_tx: broadcast::Sender<Checkpoint>,
    reorg_tx: broadcast::Sender<Hash256>,
    log: Logger,
}

impl<S: Store> ChainStore<S> {
    pub fn new(store: Arc<S>, log: Logger) -> Self {
        let (store_initialized_tx, _) = broadcast::channel(SUBSCRIPTION_CHANNEL_CAPACITY);
        let (best_block_initialized_tx, _) = broadcast::channel(SUBSCRIPTION_CHANNEL_CAPACITY);
        let (finalized_checkpoint_tx, _) = broadcast::channel(SUBSCRIPTION_CHANNEL_CAPACITY);
        let (reorg_tx, _) = broadcast::channel(SUBSCRIPTION_CHANNEL_CAPACITY);
        Self {
            store,
            initialized: RwLock::new(false),
            index: RwLock::new(RootIndex::default()),
            store_initialized_tx,
            best_block_initialized_tx,
            finalized_checkpoint_tx,
            reorg_tx,
            log,
        }
    }

    /// Reader access to the underlying store, e.g. for a caller that wants `Store::get` directly.
    pub fn get_store(&self) -> &S {
        &self.store
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.read()
    }

    pub fn subscribe_store_initialized(&self) -> broadcast::Receiver<()> {
        self.store_initialized_tx.subscribe()
    }

    pub fn subscribe_best_block_initialized(&self) -> broadcast::Receiver<Hash256> {
        self.best_block_initialized_tx.subscribe()
    }

    pub fn subscribe_finalized_checkpoint(&self) -> broadcast::Receiver<Checkpoint> {
        self.finalized_checkpoint_tx.subscribe()
    }

    pub fn subscribe_reorg(&self) -> broadcast::Receiver<Hash256> {
        self.reorg_tx.subscribe()
    }

    /// Startup protocol steps 1-2: calls `fetch` for whatever the durable backend currently has,
    /// retrying with bounded exponential backoff on transport failure. Never gives up -- the node
    /// is inert without a store, so the only way out of this loop is a successful fetch.
    pub async fn fetch_with_retry<F, T, E>(&self, mut fetch: F) -> T
    where
        F: FnMut() -> Result<T, E>,
        E: std::fmt::Display,
    {
        let mut delay = STARTUP_RETRY_BASE_DELAY;
        loop {
            match fetch() {
                Ok(value) => return value,
                Err(e) => {
                    warn!(
                        self.log,
                        "Store fetch failed, retrying";
                        "error" => %e,
                        "backoff_ms" => delay.as_millis() as u64
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(STARTUP_RETRY_MAX_DELAY);
                }
            }
        }
    }

    /// Step 3/4, genesis branch: installs a freshly synthesised genesis store. `AlreadyInitialized`
    /// is a hard error -- re-synthesising genesis over an existing chain is an operator mistake.
    pub fn initialize_from_genesis(
        &self,
        genesis_block_root: Hash256,
        genesis_slot: u64,
    ) -> Result<(), ChainStoreError> {
        self.mark_initialized()?;
        self.index
            .write()
            .blocks_by_slot
            .entry(genesis_slot)
            .or_default()
            .push(genesis_block_root);

        let _ = self.store_initialized_tx.send(());
        let _ = self.best_block_initialized_tx.send(genesis_block_root);
        info!(self.log, "Store initialized from genesis"; "root" => ?genesis_block_root);
        Ok(())
    }

    /// Step 3, `Some(store)` branch: installs a store whose head was loaded from durable storage.
    pub fn initialize_from_existing(&self, head_root: Hash256) -> Result<(), ChainStoreError> {
        self.mark_initialized()?;
        let _ = self.store_initialized_tx.send(());
        let _ = self.best_block_initialized_tx.send(head_root);
        info!(self.log, "Store initialized from durable storage"; "head_root" => ?head_root);
        Ok(())
    }

    fn mark_initialized(&self) -> Result<(), ChainStoreError> {
        let mut initialized = self.initialized.write();
        if *initialized {
            return Err(ChainStoreError::AlreadyInitialized);
        }
        *initialized = true;
        Ok(())
    }

    pub fn persist_head(&self, bytes: Vec<u8>) -> Result<(), Error> {
        self.store
            .put_bytes(DBColumn::BeaconChain, &PERSISTED_HEAD_KEY, bytes)
    }

    pub fn load_persisted_head(&self) -> Result<Option<Vec<u8>>, Error> {
        self.store.get_bytes(DBColumn::BeaconChain, &PERSISTED_HEAD_KEY)
    }

    /// Begins a transaction. All the work happens in `StoreTransaction::commit`.
    pub fn start_transaction(&self) -> StoreTransaction<'_, S> {
        StoreTransaction {
            chain_store: self,
            block_puts: Vec::new(),
            checkpoint_state_puts: Vec::new(),
            new_head: None,
            finalized: None,
        }
    }
}

/// Records a batch of index updates and (optionally) a new finalized checkpoint; `commit()`
/// performs the pruning-set computation, the storage-sink deletes, and the post-commit
/// notifications in one step. Block/state bytes themselves are written by the caller via
/// `Store::put` before recording them here -- this transaction owns the *bookkeeping* (what's
/// prunable, what to announce), not the raw key-value writes, since those already go through
/// `SimpleStoreItem`'s typed `put`.
pub struct StoreTransaction<'a, S> {
    chain_store: &'a ChainStore<S>,
    block_puts: Vec<(Hash256, u64)>,
    checkpoint_state_puts: Vec<(Hash256, u64)>,
    new_head: Option<Hash256>,
    finalized: Option<(Checkpoint, u64)>,
}

impl<'a, S: Store> StoreTransaction<'a, S> {
    /// Records that `root` (already durably written by the caller) belongs to the pruning index
    /// at `slot`.
    pub fn record_block(&mut self, root: Hash256, slot: u64) {
        self.block_puts.push((root, slot));
    }

    /// Records a checkpoint-state root belonging to `epoch`.
    pub fn record_checkpoint_state(&mut self, root: Hash256, epoch: u64) {
        self.checkpoint_state_puts.push((root, epoch));
    }

    pub fn set_head(&mut self, root: Hash256) {
        self.new_head = Some(root);
    }

    pub fn set_finalized_checkpoint(&mut self, checkpoint: Checkpoint, slots_per_epoch: u64) {
        self.finalized = Some((checkpoint, slots_per_epoch));
    }

    /// (a) computes the pruning set implied by any new finalized checkpoint; (b)/(c) deletes the
    /// pruned roots from the storage sink; (d) swaps the new index state in; (e) publishes
    /// post-commit notifications (finalized-checkpoint, reorg when the head root changed).
    ///
    /// `MemoryStore`'s writes are synchronous, so there is no separate "await durable-write
    /// acknowledgement" step here; a disk-backed `Store` would await its batch-write ack between
    /// the deletes and the index swap.
    pub fn commit(self) -> Result<(), Error> {
        let mut index = self.chain_store.index.write();
        for (root, slot) in &self.block_puts {
            index.blocks_by_slot.entry(*slot).or_default().push(*root);
        }
        for (root, epoch) in &self.checkpoint_state_puts {
            index
                .checkpoint_states_by_epoch
                .entry(*epoch)
                .or_default()
                .push(*root);
        }

        let mut pruned = 0usize;
        if let Some((finalized, slots_per_epoch)) = &self.finalized {
            let finalized_slot = finalized.epoch_start_slot(*slots_per_epoch).as_u64();
            let finalized_root = finalized.root;

            let stale_slots: Vec<u64> = index
                .blocks_by_slot
                .range(..finalized_slot)
                .map(|(slot, _)| *slot)
                .collect();
            for slot in stale_slots {
                if let Some(roots) = index.blocks_by_slot.remove(&slot) {
                    for root in roots {
                        if root == finalized_root {
                            index
                                .blocks_by_slot
                                .entry(finalized_slot)
                                .or_default()
                                .push(root);
                            continue;
                        }
                        self.chain_store
                            .store
                            .key_delete(DBColumn::BeaconBlock, root.as_bytes())?;
                        self.chain_store
                            .store
                            .key_delete(DBColumn::BeaconState, root.as_bytes())?;
                        pruned += 1;
                    }
                }
            }

            let stale_epochs: Vec<u64> = index
                .checkpoint_states_by_epoch
                .range(..finalized.epoch.as_u64())
                .map(|(epoch, _)| *epoch)
                .collect();
            for epoch in stale_epochs {
                if let Some(roots) = index.checkpoint_states_by_epoch.remove(&epoch) {
                    for root in roots {
                        self.chain_store
                            .store
                            .key_delete(DBColumn::BeaconState, root.as_bytes())?;
                    }
                }
            }
        }
        drop(index);

        if pruned > 0 {
            debug!(self.chain_store.log, "Pruned finalized blocks"; "count" => pruned);
        }

        if let Some(head_root) = self.new_head {
            let _ = self.chain_store.best_block_initialized_tx.send(head_root);
            let _ = self.chain_store.reorg_tx.send(head_root);
        }
        if let Some((finalized, _)) = self.finalized {
            let _ = self.chain_store.finalized_checkpoint_tx.send(finalized);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn test_log() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn root(slot: u64) -> Hash256 {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&slot.to_be_bytes());
        Hash256::from_slice(&bytes)
    }

    /// Blocks at slots 0..=64 are durably written and indexed; finalizing a checkpoint at
    /// epoch 2 (slot 64, with `slots_per_epoch` 32) must delete every block/state below slot 64
    /// from the store while leaving the finalized block itself in place.
    #[test]
    fn commit_prunes_blocks_below_the_finalized_slot() {
        let store = Arc::new(MemoryStore::default());
        let chain_store = ChainStore::new(store.clone(), test_log());
        chain_store
            .initialize_from_genesis(root(0), 0)
            .expect("genesis init succeeds");

        for slot in 0..=64u64 {
            let r = root(slot);
            store
                .put_bytes(DBColumn::BeaconBlock, r.as_bytes(), vec![slot as u8])
                .expect("block write succeeds");
            store
                .put_bytes(DBColumn::BeaconState, r.as_bytes(), vec![slot as u8])
                .expect("state write succeeds");

            let mut tx = chain_store.start_transaction();
            tx.record_block(r, slot);
            tx.set_head(r);
            tx.commit().expect("commit succeeds");
        }

        let finalized_root = root(64);
        let mut tx = chain_store.start_transaction();
        tx.set_finalized_checkpoint(
            Checkpoint {
                epoch: types::Epoch::new(2),
                root: finalized_root,
            },
            32,
        );
        tx.commit().expect("finalizing commit succeeds");

        for slot in 0..64u64 {
            let r = root(slot);
            assert!(
                store
                    .get_bytes(DBColumn::BeaconBlock, r.as_bytes())
                    .unwrap()
                    .is_none(),
                "block at slot {} should have been pruned",
                slot
            );
            assert!(
                store
                    .get_bytes(DBColumn::BeaconState, r.as_bytes())
                    .unwrap()
                    .is_none(),
                "state at slot {} should have been pruned",
                slot
            );
        }

        assert!(store
            .get_bytes(DBColumn::BeaconBlock, finalized_root.as_bytes())
            .unwrap()
            .is_some());
        assert!(store
            .get_bytes(DBColumn::BeaconState, finalized_root.as_bytes())
            .unwrap()
            .is_some());
    }

    #[test]
    fn finalized_checkpoint_subscribers_are_notified_on_commit() {
        let store = Arc::new(MemoryStore::default());
        let chain_store = ChainStore::new(store, test_log());
        chain_store
            .initialize_from_genesis(root(0), 0)
            .expect("genesis init succeeds");
        let mut rx = chain_store.subscribe_finalized_checkpoint();

        let finalized = Checkpoint {
            epoch: types::Epoch::new(1),
            root: root(32),
        };
        let mut tx = chain_store.start_transaction();
        tx.set_finalized_checkpoint(finalized, 32);
        tx.commit().expect("commit succeeds");

        assert_eq!(rx.try_recv().expect("notification sent"), finalized);
    }
}
