pub use lighthouse_metrics::*;

lazy_static::lazy_static! {
    pub static ref NUM_ATTESTATIONS: Result<IntGauge> =
        try_create_int_gauge("operation_pool_attestations_total", "Number of distinct attestations in the pool");
    pub static ref NUM_ATTESTER_SLASHINGS: Result<IntGauge> = try_create_int_gauge(
        "operation_pool_attester_slashings_total", "Number of attester slashings in the pool"
    );
    pub static ref NUM_PROPOSER_SLASHINGS: Result<IntGauge> = try_create_int_gauge(
        "operation_pool_proposer_slashings_total", "Number of proposer slashings in the pool"
    );
    pub static ref NUM_VOLUNTARY_EXITS: Result<IntGauge> =
        try_create_int_gauge("operation_pool_voluntary_exits_total", "Number of voluntary exits in the pool");
}
