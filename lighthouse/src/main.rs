//! Thin process entry point: builds a logger and a `tokio` runtime, loads a `ClientConfig` from
//! the path given as the first argument (or runs with defaults), starts a `Client`, and blocks
//! until `SIGINT`/`SIGTERM` triggers the stop sequence.
//!
//! Argument parsing and config-file schema validation beyond "is this valid TOML" are the
//! CLI/config loader's job, out of scope here.

use client::{Client, ClientConfig};
use slog::{crit, info, o, Drain};
use std::process::ExitCode;
use task_executor::TaskExecutor;

fn build_logger() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, o!())
}

fn load_config(log: &slog::Logger) -> Result<ClientConfig, ExitCode> {
    match std::env::args().nth(1) {
        None => Ok(ClientConfig::default()),
        Some(path) => {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                crit!(log, "Failed to read configuration file"; "path" => %path, "error" => %e);
                ExitCode::FAILURE
            })?;
            ClientConfig::from_toml(&raw).map_err(|e| {
                crit!(log, "Invalid configuration"; "error" => e);
                ExitCode::FAILURE
            })
        }
    }
}

fn main() -> ExitCode {
    let log = build_logger();

    let config = match load_config(&log) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            crit!(log, "Failed to start tokio runtime"; "error" => %e);
            return ExitCode::FAILURE;
        }
    };
    let handle = std::sync::Arc::new(runtime.handle().clone());

    let (signal, exit) = exit_future::signal();
    let (signal_tx, _signal_rx) = futures::channel::mpsc::channel(1);
    let executor = TaskExecutor::new(std::sync::Arc::downgrade(&handle), exit, log.clone(), signal_tx);

    let result = runtime.block_on(async {
        let client = match Client::new(config, executor, log.clone()) {
            Ok(client) => client,
            Err(e) => {
                crit!(log, "Invalid configuration"; "error" => %e);
                return Err(ExitCode::FAILURE);
            }
        };

        let _ = tokio::signal::ctrl_c().await;

        info!(log, "Shutting down");
        client.shutdown();
        Ok(())
    });

    // Dropping the signal unblocks every task still racing it against `exit_future::Exit`.
    drop(signal);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}
