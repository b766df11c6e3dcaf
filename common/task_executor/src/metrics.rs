pub use lighthouse_metrics::*;

lazy_static::lazy_static! {
    pub static ref TASKS_SPAWNED: Result<IntCounterVec> = try_create_int_counter_vec(
        "task_executor_tasks_spawned_total",
        "Total number of tasks spawned by name",
        &["name"]
    );
    pub static ref BLOCK_ON_TASK_TIMES: Result<HistogramVec> = try_create_histogram_vec(
        "task_executor_blocking_task_seconds",
        "Time taken by blocking tasks by name",
        &["name"]
    );
}
