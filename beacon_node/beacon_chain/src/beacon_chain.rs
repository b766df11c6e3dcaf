use crate::errors::BeaconChainError;
use crate::eth1_chain::Eth1Chain;
use crate::events::{EventKind, ServerSentEventHandler};
use crate::fork_choice_store::BeaconForkChoiceStore;
use crate::metrics;
use crate::naive_aggregation_pool::NaiveAggregationPool;
use crate::persisted_chain::PersistedBeaconChain;
use fork_choice::{ForkChoice, ForkChoiceStore};
use operation_pool::OperationPool;
use parking_lot::RwLock;
use slog::{debug, info, Logger};
use std::sync::Arc;
use store::{ChainStore, Store};
use types::{
    Attestation, AttesterSlashing, BeaconBlockBody, BeaconState, ChainSpec, Checkpoint, Hash256,
    IndexedAttestation, ProposerSlashing, SignedBeaconBlock, SignedVoluntaryExit, Slot,
};

pub type Result<T> = std::result::Result<T, BeaconChainError>;

/// The central orchestrator: owns the fork-choice store, operation pools, eth1 data source and
/// event bus, and coordinates mutation of all of them as blocks and attestations arrive.
///
/// Generic only over the durable storage backend -- protocol constants are read from an explicit
/// `ChainSpec` rather than a type parameter (see the `ChainSpec` doc comment).
pub struct BeaconChain<S> {
    pub spec: ChainSpec,
    pub store: Arc<S>,
    pub chain_store: Arc<ChainStore<S>>,
    pub fork_choice: RwLock<ForkChoice<BeaconForkChoiceStore<S>>>,
    pub op_pool: OperationPool,
    /// Aggregates unaggregated gossip attestations so a local aggregator duty can publish a
    /// single `AggregateAndProof` per vote, distinct from `op_pool`'s longer-lived inclusion pool.
    pub naive_aggregation_pool: NaiveAggregationPool,
    pub eth1_chain: Box<dyn Eth1Chain>,
    pub event_handler: ServerSentEventHandler,
    pub genesis_state: BeaconState,
    pub genesis_block_root: Hash256,
    pub log: Logger,
}

impl<S> BeaconChain<S>
where
    S: Store,
{
    /// Runs the fork-choice head-selection algorithm and returns the winning root.
    pub fn get_head(&self, current_slot: Slot) -> Result<Hash256> {
        metrics::inc_counter(&metrics::FORK_CHOICE_REQUESTS);
        let _timer = metrics::start_timer(&metrics::FORK_CHOICE_TIMES);

        let head = self
            .fork_choice
            .write()
            .get_head(current_slot, &self.spec)?;

        metrics::set_gauge(&metrics::HEAD_SLOT, current_slot.as_u64() as i64);

        Ok(head)
    }

    pub fn finalized_checkpoint(&self) -> Checkpoint {
        *self.fork_choice.read().fc_store().finalized_checkpoint()
    }

    /// Persists `block`/`state`, registers the block with fork choice, then purges the block's
    /// operations from the pools (at-most-once inclusion) and emits a head event.
    pub fn process_block(
        &self,
        current_slot: Slot,
        block: SignedBeaconBlock,
        state: BeaconState,
    ) -> Result<Hash256> {
        metrics::inc_counter(&metrics::BLOCK_PROCESSING_REQUESTS);
        let _timer = metrics::start_timer(&metrics::BLOCK_PROCESSING_TIMES);

        if block.message.slot > current_slot {
            return Err(BeaconChainError::FutureSlot);
        }

        let block_root = block.canonical_root();

        if !self
            .fork_choice
            .read()
            .contains_block(&block.message.parent_root)
            && block.message.parent_root != Hash256::zero()
        {
            return Err(BeaconChainError::ParentUnknown(block.message.parent_root));
        }

        self.store.put(&block_root, &block)?;
        self.store.put(&block_root, &state)?;

        self.fork_choice.write().on_block(
            current_slot,
            &block.message,
            block_root,
            &state,
            &self.spec,
        )?;

        self.op_pool.remove_all(&block.message.body);

        let mut tx = self.chain_store.start_transaction();
        tx.record_block(block_root, block.message.slot.as_u64());
        tx.set_head(block_root);
        tx.commit()?;
        self.persist_snapshot()?;

        metrics::inc_counter(&metrics::BLOCK_PROCESSING_SUCCESSES);
        debug!(self.log, "Block processed"; "root" => ?block_root, "slot" => block.message.slot.as_u64());

        self.event_handler.register(EventKind::Head {
            slot: block.message.slot,
            block: block_root,
            state: block.message.state_root,
        });

        Ok(block_root)
    }

    /// Writes the current fork-choice/checkpoint state under the chain store's well-known head
    /// key, so a restart can rebuild via `BeaconChainBuilder::from_store` instead of genesis.
    fn persist_snapshot(&self) -> Result<()> {
        let fork_choice = self.fork_choice.read();
        let fc_store = fork_choice.fc_store();
        let snapshot = PersistedBeaconChain {
            genesis_state: self.genesis_state.clone(),
            genesis_block_root: self.genesis_block_root,
            current_slot: fc_store.get_current_slot(),
            justified_checkpoint: *fc_store.justified_checkpoint(),
            best_justified_checkpoint: *fc_store.best_justified_checkpoint(),
            finalized_checkpoint: *fc_store.finalized_checkpoint(),
            fork_choice: fork_choice.to_persisted(),
        };
        drop(fork_choice);
        snapshot
            .store(&self.chain_store)
            .map_err(BeaconChainError::from)
    }

    /// Registers an attestation with fork choice and, if accepted, folds it into the aggregating
    /// attestation pool so it becomes available for block production.
    pub fn process_attestation(&self, current_slot: Slot, attestation: &Attestation) -> Result<()> {
        metrics::inc_counter(&metrics::ATTESTATION_PROCESSING_REQUESTS);

        let indexed = IndexedAttestation {
            attesting_indices: attestation.aggregation_bits.clone(),
            data: attestation.data.clone(),
            signature: attestation.signature.clone(),
        };

        self.fork_choice
            .write()
            .on_attestation(current_slot, &indexed, &self.spec)
            .map_err(|e| BeaconChainError::Invalid(format!("{:?}", e)))?;

        self.op_pool
            .insert_attestation(attestation.clone())
            .map_err(|e| BeaconChainError::OperationPoolError(format!("{:?}", e)))?;

        let _ = self
            .naive_aggregation_pool
            .insert(attestation, current_slot - 1);

        metrics::inc_counter(&metrics::ATTESTATION_PROCESSING_SUCCESSES);
        Ok(())
    }

    pub fn process_attester_slashing(&self, slashing: AttesterSlashing) {
        self.op_pool.insert_attester_slashing(slashing);
    }

    pub fn process_proposer_slashing(&self, slashing: ProposerSlashing) {
        self.op_pool.insert_proposer_slashing(slashing);
    }

    pub fn process_voluntary_exit(&self, exit: SignedVoluntaryExit) {
        self.op_pool.insert_voluntary_exit(exit);
    }

    /// The block-factory inclusion view: every operation currently admissible for a block
    /// produced at `state`'s slot.
    pub fn op_pool_for_block(&self, state: &BeaconState) -> BeaconBlockBody {
        self.op_pool.get_for_block(state, &self.spec)
    }

    /// Runs once per advancing `node_slot`: prunes the operation pools and the fork-choice DAG of
    /// anything the new finalized checkpoint has made unreachable.
    pub fn on_slot(&self, current_slot: Slot) -> Result<()> {
        self.op_pool.on_slot(current_slot, &self.spec);
        self.naive_aggregation_pool.prune(current_slot);

        let previous_finalized_epoch = self.finalized_checkpoint().epoch;

        self.fork_choice.write().prune()?;

        let finalized = self.finalized_checkpoint();
        metrics::set_gauge(&metrics::FINALIZED_EPOCH, finalized.epoch.as_u64() as i64);

        if finalized.epoch > previous_finalized_epoch {
            let mut tx = self.chain_store.start_transaction();
            tx.set_finalized_checkpoint(finalized, self.spec.slots_per_epoch);
            tx.commit()?;
        }

        Ok(())
    }

    pub fn log_head(&self, head_root: Hash256, slot: Slot) {
        info!(self.log, "Head updated"; "root" => ?head_root, "slot" => slot.as_u64());
    }
}
