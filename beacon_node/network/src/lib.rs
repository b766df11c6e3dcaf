mod attestation_manager;
mod block_manager;
mod gossip_processor;
mod metrics;
mod peer_id;
mod service;
mod sync_state;

pub use attestation_manager::{AttestationManager, ProcessOutcome as AttestationOutcome};
pub use block_manager::{BlockManager, ProcessOutcome as BlockOutcome};
pub use gossip_processor::{Event as GossipEvent, GossipProcessor, Work as GossipWork};
pub use peer_id::PeerId;
pub use service::{BroadcastMessage, NetworkConfig, NetworkService};
pub use sync_state::{SyncState, SyncStateTracker};
