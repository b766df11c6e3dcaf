mod metrics;

use futures::channel::mpsc;
use futures::prelude::*;
use slog::{crit, debug, o};
use std::sync::Weak;
use tokio::runtime::Handle;

/// A wrapper around a runtime handle that tracks spawned tasks and shuts them down cooperatively
/// when the program exits. Mirrors the service-shutdown pattern used throughout the beacon node:
/// each spawned task races its future against `exit`, so dropping the corresponding
/// `exit_future::Signal` is enough to unwind every task without a hard `abort`.
#[derive(Clone)]
pub struct TaskExecutor {
    handle: Weak<Handle>,
    exit: exit_future::Exit,
    signal_tx: mpsc::Sender<()>,
    log: slog::Logger,
}

impl TaskExecutor {
    pub fn new(
        handle: Weak<Handle>,
        exit: exit_future::Exit,
        log: slog::Logger,
        signal_tx: mpsc::Sender<()>,
    ) -> Self {
        Self {
            handle,
            exit,
            signal_tx,
            log,
        }
    }

    /// Derive a new `TaskExecutor` with a different `log`, keeping the handle/exit/shutdown-signal
    /// unchanged. Used to tag tasks with a component-specific logger.
    pub fn clone_with_name(&self, name: String) -> Self {
        Self {
            handle: self.handle.clone(),
            exit: self.exit.clone(),
            signal_tx: self.signal_tx.clone(),
            log: self.log.new(o!("service" => name)),
        }
    }

    /// Spawn a task that is aborted (dropped) when the shutdown `exit_future::Exit` fires.
    ///
    /// Does not block on task completion and does not return a handle; the normal choice for
    /// "fire and forget" tasks that do not need to report a value back to the spawner.
    pub fn spawn(&self, task: impl Future<Output = ()> + Send + 'static, name: &'static str) {
        if let Some(handle) = self.handle.upgrade() {
            self.spawn_monitor(handle, task, name);
        } else {
            debug!(self.log, "Couldn't spawn task. Runtime shutting down"; "task" => name);
        }
    }

    /// Spawn a blocking task on the runtime's blocking-task pool. Returns `None` if the task
    /// panicked or the runtime is shutting down.
    pub fn spawn_blocking_handle<F, R>(
        &self,
        task: F,
        name: &'static str,
    ) -> Option<tokio::task::JoinHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let timer = metrics::start_timer_vec(&metrics::BLOCK_ON_TASK_TIMES, &[name]);
        let handle = self.handle.upgrade()?;
        let join_handle = handle.spawn_blocking(move || {
            let _timer = timer;
            task()
        });
        Some(join_handle)
    }

    fn spawn_monitor(
        &self,
        handle: std::sync::Arc<Handle>,
        task: impl Future<Output = ()> + Send + 'static,
        name: &'static str,
    ) {
        let exit = self.exit.clone();
        let log = self.log.clone();
        metrics::inc_counter_vec(&metrics::TASKS_SPAWNED, &[name]);

        handle.spawn(async move {
            let run = future::select(Box::pin(task), exit);
            match run.await {
                future::Either::Left(((), _)) => {}
                future::Either::Right(((), _)) => {
                    crit!(log, "Shutdown required"; "task" => name);
                }
            }
        });
    }
}
