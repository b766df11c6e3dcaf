//! Provides the `GossipProcessor`, a multi-threaded processor for messages arriving over gossip
//! that need to be handed to the attestation and block managers.
//!
//! Uses `tokio` tasks (instead of raw threads) to provide:
//!
//! - A "manager" task, which either spawns worker tasks or enqueues work.
//! - One or more "worker" tasks which perform the actual chain processing.
//!
//! ## Purpose
//!
//! 1. Moving long-running, blocking work off the main `tokio` executor.
//! 2. A fixed-length buffer for consensus messages, so overload sheds load instead of queuing
//!    without bound.
//!
//! ## Detail
//!
//! A single manager task listens on a channel of `Event`s: either a new parcel of work, or a
//! worker reporting that it has gone idle. New work is handed to a freshly spawned worker if
//! under the worker cap, otherwise queued (most-recent-first, with the oldest entries dropped
//! once the queue is full).

use crate::attestation_manager::AttestationManager;
use crate::block_manager::BlockManager;
use crate::metrics;
use crate::peer_id::PeerId;
use slog::{error, Logger};
use std::collections::VecDeque;
use std::sync::Arc;
use store::Store;
use task_executor::TaskExecutor;
use tokio::sync::mpsc;
use types::{Attestation, BeaconState, SignedBeaconBlock, Slot};

/// The maximum number of items that can be enqueued for the manager to process.
const MAX_WORK_QUEUE_LEN: usize = 65_535;

/// The maximum number of queued attestations that will be stored before they start being dropped.
const MAX_ATTESTATION_QUEUE_LEN: usize = 16_384;

/// The maximum number of queued blocks that will be stored before they start being dropped.
const MAX_BLOCK_QUEUE_LEN: usize = 1_024;

const MANAGER_TASK_NAME: &str = "gossip_processor_manager";
const WORKER_TASK_NAME: &str = "gossip_processor_worker";

struct QueueItem<T> {
    peer_id: PeerId,
    item: T,
}

/// A last-in-first-out queue with a maximum length: under load this favours the most recently
/// received gossip over the oldest, since the oldest is the most likely to already be stale.
struct LifoQueue<T> {
    queue: VecDeque<QueueItem<T>>,
    max_length: usize,
}

impl<T> LifoQueue<T> {
    fn new(max_length: usize) -> Self {
        Self {
            queue: VecDeque::default(),
            max_length,
        }
    }

    fn push(&mut self, item: QueueItem<T>) {
        if self.queue.len() == self.max_length {
            self.queue.pop_back();
        }
        self.queue.push_front(item);
    }

    fn pop(&mut self) -> Option<QueueItem<T>> {
        self.queue.pop_front()
    }

    fn is_full(&self) -> bool {
        self.queue.len() >= self.max_length
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

pub enum Work {
    Attestation(Box<(Attestation, Slot)>),
    Block(Box<(SignedBeaconBlock, BeaconState, Slot)>),
}

/// An event processed by the manager task.
pub enum Event {
    WorkerIdle,
    Work { peer_id: PeerId, work: Work },
}

/// A multi-threaded processor for gossip messages that need to reach the beacon chain.
pub struct GossipProcessor<S> {
    pub attestation_manager: Arc<AttestationManager<S>>,
    pub block_manager: Arc<BlockManager<S>>,
    pub executor: TaskExecutor,
    pub max_workers: usize,
    pub current_workers: usize,
    pub log: Logger,
}

impl<S> GossipProcessor<S>
where
    S: Store + Send + Sync + 'static,
{
    /// Spawns the manager task and returns the sender new work should be submitted through.
    ///
    /// Callers must never send `Event::WorkerIdle`; that variant is reserved for worker tasks
    /// reporting back to the manager.
    pub fn spawn_manager(mut self) -> mpsc::Sender<Event> {
        let (event_tx, mut event_rx) = mpsc::channel::<Event>(MAX_WORK_QUEUE_LEN);
        let mut block_queue = LifoQueue::new(MAX_BLOCK_QUEUE_LEN);
        let mut attestation_queue = LifoQueue::new(MAX_ATTESTATION_QUEUE_LEN);
        let inner_event_tx = event_tx.clone();
        let executor = self.executor.clone();

        executor.spawn(
            async move {
                while let Some(event) = event_rx.recv().await {
                    metrics::inc_counter(&metrics::GOSSIP_WORKERS_SPAWNED);

                    if matches!(event, Event::WorkerIdle) {
                        self.current_workers = self.current_workers.saturating_sub(1);
                    }

                    let can_spawn = self.current_workers < self.max_workers;
                    let initial_block_len = block_queue.len();
                    let initial_attestation_len = attestation_queue.len();

                    match event {
                        Event::WorkerIdle => {
                            // Blocks unblock more downstream work (attestations queued on them),
                            // so prefer draining the block queue first.
                            if let Some(item) = block_queue.pop() {
                                self.spawn_worker(inner_event_tx.clone(), item.peer_id, item.item);
                            } else if let Some(item) = attestation_queue.pop() {
                                self.spawn_worker(inner_event_tx.clone(), item.peer_id, item.item);
                            }
                        }
                        Event::Work { peer_id, work } => match work {
                            Work::Block(_) if can_spawn => {
                                self.spawn_worker(inner_event_tx.clone(), peer_id, work)
                            }
                            Work::Block(boxed) => block_queue.push(QueueItem {
                                peer_id,
                                item: Work::Block(boxed),
                            }),
                            Work::Attestation(_) if can_spawn => {
                                self.spawn_worker(inner_event_tx.clone(), peer_id, work)
                            }
                            Work::Attestation(boxed) => attestation_queue.push(QueueItem {
                                peer_id,
                                item: Work::Attestation(boxed),
                            }),
                        },
                    }

                    metrics::set_gauge(&metrics::GOSSIP_WORKERS_SPAWNED, self.current_workers as i64);

                    if initial_block_len != block_queue.len() && block_queue.is_full() {
                        metrics::inc_counter_vec(&metrics::GOSSIP_QUEUE_FULL, &["block"]);
                        error!(self.log, "Block queue full"; "queue_len" => block_queue.max_length);
                    }
                    if initial_attestation_len != attestation_queue.len() && attestation_queue.is_full() {
                        metrics::inc_counter_vec(&metrics::GOSSIP_QUEUE_FULL, &["attestation"]);
                        error!(self.log, "Attestation queue full"; "queue_len" => attestation_queue.max_length);
                    }
                }
            },
            MANAGER_TASK_NAME,
        );

        event_tx
    }

    /// Spawns a blocking worker to process a single parcel of work, reporting back to the manager
    /// via `Event::WorkerIdle` once done.
    fn spawn_worker(&mut self, event_tx: mpsc::Sender<Event>, peer_id: PeerId, work: Work) {
        self.current_workers = self.current_workers.saturating_add(1);
        let attestation_manager = self.attestation_manager.clone();
        let block_manager = self.block_manager.clone();
        let log = self.log.clone();

        self.executor.spawn_blocking_handle(
            move || {
                match work {
                    Work::Attestation(boxed) => {
                        let (attestation, current_slot) = *boxed;
                        attestation_manager.process(current_slot, attestation);
                    }
                    Work::Block(boxed) => {
                        let (block, state, current_slot) = *boxed;
                        block_manager.process(current_slot, block, state, peer_id);
                    }
                }
                if event_tx.blocking_send(Event::WorkerIdle).is_err() {
                    slog::debug!(log, "Gossip manager channel closed");
                }
            },
            WORKER_TASK_NAME,
        );
    }
}
