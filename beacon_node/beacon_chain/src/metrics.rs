pub use lighthouse_metrics::*;

use lazy_static::lazy_static;

lazy_static! {
    /*
     * Block processing
     */
    pub static ref BLOCK_PROCESSING_REQUESTS: Result<IntCounter> =
        try_create_int_counter("beacon_block_processing_requests_total", "Count of all block processing requests");
    pub static ref BLOCK_PROCESSING_SUCCESSES: Result<IntCounter> =
        try_create_int_counter("beacon_block_processing_successes_total", "Count of blocks imported successfully");
    pub static ref BLOCK_PROCESSING_TIMES: Result<Histogram> =
        try_create_histogram("beacon_block_processing_seconds", "Full runtime of block processing");

    /*
     * Attestation processing
     */
    pub static ref ATTESTATION_PROCESSING_REQUESTS: Result<IntCounter> =
        try_create_int_counter("beacon_attestation_processing_requests_total", "Count of all attestation processing requests");
    pub static ref ATTESTATION_PROCESSING_SUCCESSES: Result<IntCounter> =
        try_create_int_counter("beacon_attestation_processing_successes_total", "Count of attestations imported successfully");

    /*
     * Fork choice
     */
    pub static ref FORK_CHOICE_REQUESTS: Result<IntCounter> =
        try_create_int_counter("beacon_fork_choice_requests_total", "Count of times get_head was called");
    pub static ref FORK_CHOICE_TIMES: Result<Histogram> =
        try_create_histogram("beacon_fork_choice_seconds", "Time taken to run the fork choice head algorithm");

    /*
     * Chain head
     */
    pub static ref HEAD_SLOT: Result<IntGauge> =
        try_create_int_gauge("beacon_head_slot", "Slot of the current chain head");
    pub static ref FINALIZED_EPOCH: Result<IntGauge> =
        try_create_int_gauge("beacon_finalized_epoch", "Current finalized epoch");
}
