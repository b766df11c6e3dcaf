use crate::client_config::ClientConfig;
use beacon_chain::{BeaconChain, BeaconChainBuilder};
use network::{BroadcastMessage, NetworkService};
use parking_lot::Mutex;
use slog::{info, Logger};
use slot_clock::SystemTimeSlotClock;
use std::sync::Arc;
use std::time::Duration;
use store::{MemoryStore, Store};
use task_executor::TaskExecutor;
use timer::{TickObserver, Timer};
use types::{Epoch, Hash256, Slot};

#[derive(Debug)]
pub enum Error {
    InvalidConfiguration(String),
    StoreUninitialized,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidConfiguration(reason) => write!(f, "invalid configuration: {}", reason),
            Error::StoreUninitialized => write!(f, "store uninitialized"),
        }
    }
}

impl std::error::Error for Error {}

/// Bridges the timer's slot-phase ticks to the network's queued-item managers. The gossip
/// publish/aggregate-duty side of attestation-due and aggregation-due has no subscriber here
/// since the validator client and REST API that would consume them are out of scope; this
/// observer only drains the managers' internal queues and prunes them against finality.
struct NetworkTickObserver<S> {
    chain: Arc<BeaconChain<S>>,
    network: Arc<NetworkService<S>>,
    slots_per_epoch: u64,
    last_finalized_epoch: Mutex<Epoch>,
}

impl<S> TickObserver for NetworkTickObserver<S>
where
    S: Store + Send + Sync + 'static,
{
    fn on_slot_start(&self, slot: Slot) {
        self.network.attestation_manager.on_slot(slot);
        self.network.block_manager.on_slot(slot);
        self.network.block_manager.expire_stale_fetches();

        let finalized_epoch = self.chain.finalized_checkpoint().epoch;
        let mut last = self.last_finalized_epoch.lock();
        if finalized_epoch > *last {
            *last = finalized_epoch;
            let finalized_slot = finalized_epoch.start_slot(self.slots_per_epoch);
            self.network
                .attestation_manager
                .on_finalized_checkpoint(finalized_epoch);
            self.network.block_manager.prune_finalized(finalized_slot);
        }
    }

    fn on_attestation_due(&self, slot: Slot, head_root: Hash256, _peer_count: usize) {
        self.network
            .publish(BroadcastMessage::BroadcastAttestation(head_root, slot));
    }

    fn on_aggregation_due(&self, slot: Slot) {
        self.network.publish(BroadcastMessage::BroadcastAggregates(slot));
    }

    fn peer_count(&self) -> usize {
        self.network.peer_count()
    }

    fn is_syncing(&self) -> bool {
        self.network.is_syncing()
    }

    fn on_sync_slot(&self, slot: Slot) {
        info!(self.chain.log, "Sync slot observed"; "slot" => slot.as_u64());
    }
}

/// Wires together the store, fork-choice engine, operation pools, beacon chain, network managers
/// and timer, and owns their startup/shutdown ordering.
///
/// Builds an in-memory `MemoryStore`-backed chain (the persistent database engine is out of
/// scope) and reads configuration from a `ClientConfig` value rather than `clap::ArgMatches` (the
/// CLI/config loader is likewise out of scope).
pub struct Client<S> {
    pub chain: Arc<BeaconChain<S>>,
    pub network: Arc<NetworkService<S>>,
    pub timer: Arc<Timer<S, SystemTimeSlotClock>>,
    log: Logger,
}

impl Client<MemoryStore> {
    pub fn new(config: ClientConfig, executor: TaskExecutor, log: Logger) -> Result<Self, Error> {
        if config.interop.enabled && config.interop.genesis_time == 0 {
            return Err(Error::InvalidConfiguration(
                "interop.enabled requires a non-zero genesis_time".to_string(),
            ));
        }

        let store = Arc::new(MemoryStore::default());

        // Step 1 of the startup protocol: prefer an existing chain over synthesising a fresh
        // genesis. `from_store` only succeeds if a previous run actually persisted a head
        // snapshot under this store; a brand-new `MemoryStore` never has one, so the common case
        // falls straight through to genesis.
        let existing = BeaconChainBuilder::from_store(config.spec.clone(), log.clone())
            .build(store.clone());

        let chain = Arc::new(match existing {
            Ok(chain) => chain,
            Err(reason) => {
                info!(log, "Starting from genesis"; "reason" => reason);
                let builder = if config.interop.enabled {
                    BeaconChainBuilder::quick_start(
                        config.interop.genesis_time,
                        config.spec.clone(),
                        log.clone(),
                    )
                } else {
                    BeaconChainBuilder::recent_genesis(60, config.spec.clone(), log.clone())
                };
                builder.build(store).map_err(Error::InvalidConfiguration)?
            }
        });

        // The startup-timeout/target-peer-count knobs live on `ClientConfig::startup` rather than
        // `NetworkConfig` itself, since they gate the whole node's readiness, not just the
        // network stack; fold them in before handing the config to `NetworkService`.
        let mut network_config = config.network.clone();
        network_config.target_peer_count = config.startup.target_peer_count;
        network_config.startup_timeout_seconds = config.startup.timeout_seconds;

        let network = Arc::new(NetworkService::start(
            &network_config,
            chain.clone(),
            executor.clone(),
            log.clone(),
        ));

        let slot_clock = SystemTimeSlotClock::new(
            chain.genesis_state.slot,
            Duration::from_secs(chain.genesis_state.genesis_time),
            Duration::from_secs(config.spec.seconds_per_slot),
        );
        let tick_observer = Arc::new(NetworkTickObserver {
            chain: chain.clone(),
            network: network.clone(),
            slots_per_epoch: config.spec.slots_per_epoch,
            last_finalized_epoch: Mutex::new(Epoch::new(0)),
        });
        let timer = Arc::new(Timer::new(
            chain.clone(),
            slot_clock,
            tick_observer,
            log.clone(),
        ));
        timer.clone().spawn(&executor);

        info!(log, "Client started"; "data_dir" => ?config.data_dir);

        Ok(Self {
            chain,
            network,
            timer,
            log,
        })
    }
}

impl<S> Client<S>
where
    S: Store + Send + Sync + 'static,
{
    /// Runs the stop sequence in order. Each step is synchronous here since every owned component
    /// is drained in-process rather than over a network boundary; a deployment with a REST
    /// API/sync service in front would await each of those first.
    pub fn shutdown(self) {
        info!(self.log, "Shutting down");
        // Sync-state tracker, attestation manager, and block manager are owned by `self.network`
        // and are dropped with it; operation pools are owned by `self.chain` and drained by
        // simply dropping it last, after the store has had a chance to flush via `Drop`.
        drop(self.network);
        drop(self.timer);
        drop(self.chain);
        info!(self.log, "Shutdown complete");
    }
}
