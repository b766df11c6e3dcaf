use crate::attestation_manager::AttestationManager;
use crate::block_manager::BlockManager;
use crate::gossip_processor::{Event, GossipProcessor};
use crate::peer_id::PeerId;
use crate::sync_state::{SyncState, SyncStateTracker};
use beacon_chain::BeaconChain;
use parking_lot::RwLock;
use serde_derive::{Deserialize, Serialize};
use slog::{info, Logger};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use store::Store;
use task_executor::TaskExecutor;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use types::{Hash256, Slot};

/// The subscription capacity for `NetworkService::subscribe_broadcasts`, matched to the same
/// bound `beacon_chain`'s `ServerSentEventHandler` uses for its own broadcast channel.
const BROADCAST_CHANNEL_CAPACITY: usize = 16;

/// Externally configurable knobs for the network service. The libp2p transport's own
/// configuration (listen addresses, discovery, ENR) has no counterpart here since the transport
/// itself is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Upper bound on concurrently running gossip-processing workers.
    pub max_workers: usize,
    /// Peer count the sync-state tracker treats as "enough" to call itself caught up.
    pub target_peer_count: usize,
    /// How long the sync-state tracker waits, with any peers at all, before calling itself caught
    /// up regardless of `target_peer_count`.
    pub startup_timeout_seconds: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            target_peer_count: 1,
            startup_timeout_seconds: 60,
        }
    }
}

/// Gossip-publish intents a would-be libp2p layer (out of scope) would place on the wire,
/// produced by the timer's attestation-due/aggregation-due phases.
#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastMessage {
    BroadcastAttestation(Hash256, Slot),
    BroadcastAggregates(Slot),
}

/// Owns the attestation/block managers, the sync-state tracker, and the gossip dispatch pipeline
/// that feeds them, minus anything that only the libp2p transport or its gossip codec would need.
pub struct NetworkService<S> {
    pub attestation_manager: Arc<AttestationManager<S>>,
    pub block_manager: Arc<BlockManager<S>>,
    pub sync_state: Arc<SyncStateTracker>,
    peers: RwLock<HashSet<PeerId>>,
    sync_service_active: AtomicBool,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    gossip_tx: mpsc::Sender<Event>,
    log: Logger,
}

impl<S> NetworkService<S>
where
    S: Store + Send + Sync + 'static,
{
    pub fn start(
        config: &NetworkConfig,
        chain: Arc<BeaconChain<S>>,
        executor: TaskExecutor,
        log: Logger,
    ) -> Self {
        let attestation_manager = Arc::new(AttestationManager::new(chain.clone(), log.clone()));
        let block_manager = Arc::new(BlockManager::new(chain, log.clone()));
        let sync_state = Arc::new(SyncStateTracker::new(
            config.target_peer_count,
            config.startup_timeout_seconds,
        ));

        let processor = GossipProcessor {
            attestation_manager: attestation_manager.clone(),
            block_manager: block_manager.clone(),
            executor,
            max_workers: config.max_workers,
            current_workers: 0,
            log: log.clone(),
        };
        let gossip_tx = processor.spawn_manager();
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);

        info!(log, "Network service started"; "max_workers" => config.max_workers);

        Self {
            attestation_manager,
            block_manager,
            sync_state,
            peers: RwLock::new(HashSet::new()),
            sync_service_active: AtomicBool::new(false),
            broadcast_tx,
            gossip_tx,
            log,
        }
    }

    /// Submits gossip-sourced work to the processing pipeline. Returns `false` if the manager
    /// task has shut down.
    pub fn submit(&self, peer_id: PeerId, work: crate::gossip_processor::Work) -> bool {
        self.gossip_tx
            .try_send(Event::Work { peer_id, work })
            .is_ok()
    }

    pub fn add_peer(&self, peer_id: PeerId) -> SyncState {
        self.peers.write().insert(peer_id);
        self.refresh_sync_state()
    }

    pub fn remove_peer(&self, peer_id: &PeerId) -> SyncState {
        self.peers.write().remove(peer_id);
        self.refresh_sync_state()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.read().len()
    }

    /// Set by the (out-of-scope) sync service whenever it starts or finishes a catch-up pass.
    pub fn set_sync_service_active(&self, active: bool) -> SyncState {
        self.sync_service_active.store(active, Ordering::SeqCst);
        self.refresh_sync_state()
    }

    pub fn is_syncing(&self) -> bool {
        !self.sync_state.is_in_sync()
    }

    fn refresh_sync_state(&self) -> SyncState {
        self.sync_state.update(
            self.peer_count(),
            self.sync_service_active.load(Ordering::SeqCst),
        )
    }

    pub fn subscribe_broadcasts(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.broadcast_tx.subscribe()
    }

    pub fn publish(&self, message: BroadcastMessage) {
        let _ = self.broadcast_tx.send(message);
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_chain::BeaconChainBuilder;
    use store::MemoryStore;
    use task_executor::TaskExecutor;
    use types::ChainSpec;

    /// Builds a `TaskExecutor` backed by a real (but never-driven-to-completion-here) tokio
    /// runtime, the same way `client`'s integration wiring constructs one, minus the shutdown
    /// signal being held anywhere but this function's return value.
    fn test_executor(log: slog::Logger) -> (TaskExecutor, exit_future::Signal, tokio::runtime::Runtime) {
        let runtime = tokio::runtime::Runtime::new().expect("runtime builds");
        let handle = std::sync::Arc::new(runtime.handle().clone());
        let (signal, exit) = exit_future::signal();
        let (signal_tx, _signal_rx) = futures::channel::mpsc::channel(1);
        let executor = TaskExecutor::new(std::sync::Arc::downgrade(&handle), exit, log, signal_tx);
        (executor, signal, runtime)
    }

    fn test_service() -> (NetworkService<MemoryStore>, exit_future::Signal, tokio::runtime::Runtime) {
        let log = slog::Logger::root(slog::Discard, slog::o!());
        let chain = Arc::new(
            BeaconChainBuilder::quick_start(1000, ChainSpec::mainnet(), log.clone())
                .build(Arc::new(MemoryStore::default()))
                .expect("genesis build always succeeds"),
        );
        let (executor, signal, runtime) = test_executor(log.clone());
        let config = NetworkConfig {
            max_workers: 1,
            target_peer_count: 2,
            startup_timeout_seconds: 3600,
        };
        let service = NetworkService::start(&config, chain, executor, log);
        (service, signal, runtime)
    }

    #[test]
    fn peer_tracking_drives_sync_state() {
        let (service, _signal, _runtime) = test_service();
        assert_eq!(service.sync_state.current_state(), SyncState::Pending);

        service.add_peer(PeerId::new("peer-a"));
        assert_eq!(service.peer_count(), 1);
        assert_eq!(service.sync_state.current_state(), SyncState::Syncing);

        service.add_peer(PeerId::new("peer-b"));
        assert_eq!(service.peer_count(), 2);
        assert_eq!(service.sync_state.current_state(), SyncState::InSync);

        service.remove_peer(&PeerId::new("peer-a"));
        assert_eq!(service.peer_count(), 1);
        assert!(service.is_syncing());
    }

    #[test]
    fn sync_service_active_overrides_peer_count() {
        let (service, _signal, _runtime) = test_service();
        service.add_peer(PeerId::new("peer-a"));
        service.add_peer(PeerId::new("peer-b"));
        assert!(!service.is_syncing());

        service.set_sync_service_active(true);
        assert!(service.is_syncing());
    }

    #[test]
    fn broadcasts_reach_subscribers() {
        let (service, _signal, _runtime) = test_service();
        let mut rx = service.subscribe_broadcasts();
        service.publish(BroadcastMessage::BroadcastAggregates(Slot::new(5)));
        assert_eq!(
            rx.try_recv().unwrap(),
            BroadcastMessage::BroadcastAggregates(Slot::new(5))
        );
    }
}
