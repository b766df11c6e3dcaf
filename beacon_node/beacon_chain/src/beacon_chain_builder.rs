use crate::eth1_chain::{CachingEth1Chain, InteropEth1Chain};
use crate::events::ServerSentEventHandler;
use crate::fork_choice_store::BeaconForkChoiceStore;
use crate::naive_aggregation_pool::NaiveAggregationPool;
use crate::persisted_chain::PersistedBeaconChain;
use crate::BeaconChain;
use fork_choice::ForkChoice;
use operation_pool::OperationPool;
use slog::{info, Logger};
use std::sync::Arc;
use std::time::SystemTime;
use store::{ChainStore, Store};
use types::{BeaconBlock, BeaconState, ChainSpec, Hash256};

enum BuildStrategy {
    FromGenesis {
        genesis_state: Box<BeaconState>,
        genesis_block: Box<BeaconBlock>,
    },
    LoadFromStore,
}

/// Assembles a `BeaconChain`, stripped of the yaml/http-bootstrap genesis sources and the
/// validator-deposit interop procedure, both of which depend on state-transition and BLS
/// machinery out of scope here.
pub struct BeaconChainBuilder {
    build_strategy: BuildStrategy,
    spec: ChainSpec,
    log: Logger,
}

impl BeaconChainBuilder {
    pub fn recent_genesis(minutes: u64, spec: ChainSpec, log: Logger) -> Self {
        Self::quick_start(recent_genesis_time(minutes), spec, log)
    }

    pub fn quick_start(genesis_time: u64, spec: ChainSpec, log: Logger) -> Self {
        let genesis_state = interop_genesis_state(genesis_time);
        Self::from_genesis_state(genesis_state, spec, log)
    }

    fn from_genesis_state(genesis_state: BeaconState, spec: ChainSpec, log: Logger) -> Self {
        Self {
            build_strategy: BuildStrategy::FromGenesis {
                genesis_block: Box::new(genesis_block(&genesis_state)),
                genesis_state: Box::new(genesis_state),
            },
            spec,
            log,
        }
    }

    pub fn from_store(spec: ChainSpec, log: Logger) -> Self {
        Self {
            build_strategy: BuildStrategy::LoadFromStore,
            spec,
            log,
        }
    }

    pub fn build<S>(self, store: Arc<S>) -> Result<BeaconChain<S>, String>
    where
        S: Store,
    {
        match self.build_strategy {
            BuildStrategy::LoadFromStore => {
                let chain_store = Arc::new(ChainStore::new(store.clone(), self.log.clone()));
                let persisted = PersistedBeaconChain::load(&chain_store)
                    .map_err(|e| format!("Failed to read persisted chain: {:?}", e))?
                    .ok_or_else(|| "No persisted chain found in store".to_string())?;

                let fc_store = BeaconForkChoiceStore::from_persisted(
                    store.clone(),
                    persisted.current_slot,
                    persisted.justified_checkpoint,
                    persisted.best_justified_checkpoint,
                    persisted.finalized_checkpoint,
                );
                let mut fork_choice = ForkChoice::from_persisted(persisted.fork_choice, fc_store)
                    .map_err(|e| format!("Failed to restore fork choice: {:?}", e))?;

                let head_root = fork_choice
                    .get_head(persisted.current_slot, &self.spec)
                    .map_err(|e| format!("Failed to select head on restart: {:?}", e))?;
                chain_store
                    .initialize_from_existing(head_root)
                    .map_err(|e| format!("Failed to initialize chain store: {:?}", e))?;

                info!(
                    self.log,
                    "Beacon chain restored from store";
                    "head_root" => ?head_root,
                    "slot" => persisted.current_slot.as_u64()
                );

                Ok(BeaconChain {
                    spec: self.spec,
                    store,
                    chain_store,
                    fork_choice: parking_lot::RwLock::new(fork_choice),
                    op_pool: OperationPool::new(),
                    naive_aggregation_pool: NaiveAggregationPool::new(),
                    eth1_chain: Box::new(CachingEth1Chain::new()),
                    event_handler: ServerSentEventHandler::new(),
                    genesis_state: persisted.genesis_state,
                    genesis_block_root: persisted.genesis_block_root,
                    log: self.log,
                })
            }
            BuildStrategy::FromGenesis {
                genesis_block,
                genesis_state,
            } => {
                let fc_store = BeaconForkChoiceStore::get_genesis(
                    store.clone(),
                    &genesis_state,
                    self.spec.slots_per_epoch,
                );
                let genesis_root = genesis_block.canonical_root();
                let fork_choice = ForkChoice::from_genesis(
                    fc_store,
                    genesis_root,
                    &genesis_block,
                    &genesis_state,
                    &self.spec,
                )
                .map_err(|e| format!("Failed to initialize fork choice: {:?}", e))?;

                let chain_store = Arc::new(ChainStore::new(store.clone(), self.log.clone()));
                chain_store
                    .initialize_from_genesis(genesis_root, genesis_block.slot.as_u64())
                    .map_err(|e| format!("Failed to initialize chain store: {:?}", e))?;

                Ok(BeaconChain {
                    spec: self.spec,
                    store,
                    chain_store,
                    fork_choice: parking_lot::RwLock::new(fork_choice),
                    op_pool: OperationPool::new(),
                    naive_aggregation_pool: NaiveAggregationPool::new(),
                    eth1_chain: Box::new(InteropEth1Chain::default()),
                    event_handler: ServerSentEventHandler::new(),
                    genesis_state,
                    genesis_block_root: genesis_root,
                    log: self.log,
                })
            }
        }
    }
}

fn genesis_block(genesis_state: &BeaconState) -> BeaconBlock {
    let mut genesis_block = BeaconBlock::default();
    genesis_block.state_root = genesis_state.canonical_root();
    genesis_block
}

/// Builds a minimal genesis state suitable for interop/testnets. The full eth2 interop procedure
/// (deterministic validator keypairs, deposit merkle proofs) depends on state-transition and BLS
/// machinery that is out of scope here.
fn interop_genesis_state(genesis_time: u64) -> BeaconState {
    let mut state = BeaconState::default();
    state.genesis_time = genesis_time;
    state.eth1_data.block_hash = Hash256::from_slice(&[42; 32]);
    state
}

/// Returns the system time, rounded down to the nearest `minutes` boundary. Used for easily
/// creating testnets with a recent, round genesis time.
fn recent_genesis_time(minutes: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let secs_after_last_period = now.checked_rem(minutes * 60).unwrap_or(0);
    now - secs_after_last_period
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn interop_state() {
        let genesis_time = 42;
        let state = interop_genesis_state(genesis_time);

        assert_eq!(
            state.eth1_data.block_hash,
            Hash256::from_slice(&[42; 32]),
            "eth1 block hash should be co-ordinated junk"
        );
        assert_eq!(
            state.genesis_time, genesis_time,
            "genesis time should be as specified"
        );
    }
}
