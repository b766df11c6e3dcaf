pub use lighthouse_metrics::*;

use lazy_static::lazy_static;

lazy_static! {
    pub static ref ATTESTATIONS_ACCEPTED: Result<IntCounter> = try_create_int_counter(
        "network_attestations_accepted_total",
        "Number of attestations accepted by the attestation manager"
    );
    pub static ref ATTESTATIONS_REJECTED: Result<IntCounter> = try_create_int_counter(
        "network_attestations_rejected_total",
        "Number of attestations rejected by the attestation manager"
    );
    pub static ref ATTESTATIONS_DEFERRED_PENDING: Result<IntCounter> = try_create_int_counter(
        "network_attestations_deferred_pending_total",
        "Number of attestations queued on a missing parent block"
    );
    pub static ref ATTESTATIONS_DEFERRED_FUTURE: Result<IntCounter> = try_create_int_counter(
        "network_attestations_deferred_future_total",
        "Number of attestations queued on a future slot"
    );
    pub static ref BLOCKS_IMPORTED: Result<IntCounter> = try_create_int_counter(
        "network_blocks_imported_total",
        "Number of blocks successfully imported"
    );
    pub static ref BLOCKS_DEFERRED_PENDING: Result<IntCounter> = try_create_int_counter(
        "network_blocks_deferred_pending_total",
        "Number of blocks queued on a missing parent"
    );
    pub static ref BLOCKS_DEFERRED_FUTURE: Result<IntCounter> = try_create_int_counter(
        "network_blocks_deferred_future_total",
        "Number of blocks queued on a future slot"
    );
    pub static ref BLOCKS_REJECTED: Result<IntCounter> = try_create_int_counter(
        "network_blocks_rejected_total",
        "Number of blocks rejected by the block manager"
    );
    pub static ref GOSSIP_QUEUE_FULL: Result<IntCounterVec> = try_create_int_counter_vec(
        "network_gossip_queue_full_total",
        "Number of gossip messages dropped because their queue was full",
        &["type"]
    );
    pub static ref GOSSIP_WORKERS_SPAWNED: Result<IntGauge> = try_create_int_gauge(
        "network_gossip_workers_spawned",
        "Number of gossip processing workers currently running"
    );
    pub static ref SYNC_STATE: Result<IntGauge> =
        try_create_int_gauge("network_sync_state", "Current sync state (0=pending,1=syncing,2=insync)");
}
