use tokio::sync::broadcast;
use types::{Checkpoint, Hash256, Slot};

const DEFAULT_CHANNEL_CAPACITY: usize = 10;

/// Broadcasts notable chain events (new head, finality, reorgs) to any number of subscribers --
/// the beacon node's equivalent of a server-sent-events stream, without committing to an HTTP
/// framework here.
pub struct ServerSentEventHandler {
    head_tx: broadcast::Sender<EventKind>,
    finalized_tx: broadcast::Sender<EventKind>,
    reorg_tx: broadcast::Sender<EventKind>,
}

impl Default for ServerSentEventHandler {
    fn default() -> Self {
        let (head_tx, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        let (finalized_tx, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        let (reorg_tx, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);

        Self {
            head_tx,
            finalized_tx,
            reorg_tx,
        }
    }
}

impl ServerSentEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, event: EventKind) {
        let tx = match &event {
            EventKind::Head { .. } => &self.head_tx,
            EventKind::FinalizedCheckpoint(_) => &self.finalized_tx,
            EventKind::ChainReorg { .. } => &self.reorg_tx,
        };

        // No subscribers is not an error: the event is simply dropped.
        let _ = tx.send(event);
    }

    pub fn subscribe_head(&self) -> broadcast::Receiver<EventKind> {
        self.head_tx.subscribe()
    }

    pub fn subscribe_finalized(&self) -> broadcast::Receiver<EventKind> {
        self.finalized_tx.subscribe()
    }

    pub fn subscribe_reorgs(&self) -> broadcast::Receiver<EventKind> {
        self.reorg_tx.subscribe()
    }

    pub fn head_receiver_count(&self) -> usize {
        self.head_tx.receiver_count()
    }

    pub fn finalized_receiver_count(&self) -> usize {
        self.finalized_tx.receiver_count()
    }

    pub fn reorg_receiver_count(&self) -> usize {
        self.reorg_tx.receiver_count()
    }

    pub fn has_head_subscribers(&self) -> bool {
        self.head_receiver_count() > 0
    }

    pub fn has_finalized_subscribers(&self) -> bool {
        self.finalized_receiver_count() > 0
    }

    pub fn has_reorg_subscribers(&self) -> bool {
        self.reorg_receiver_count() > 0
    }
}

#[derive(Debug, Clone)]
pub enum EventKind {
    Head {
        slot: Slot,
        block: Hash256,
        state: Hash256,
    },
    FinalizedCheckpoint(Checkpoint),
    ChainReorg {
        slot: Slot,
        depth: u64,
        old_head_block: Hash256,
        new_head_block: Hash256,
    },
}
