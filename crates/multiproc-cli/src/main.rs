#![doc = include_str!("../README.md")]

mod command;
mod config;
mod input;
mod telemetry;

use clap::Parser;
use command::CommandProcessor;
use config::{CliArgs, RunConfig};
use input::feed_lines;
use multiproc::{CancellationToken, Coordinator, shared_channel};
use telemetry::init_telemetry;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    init_telemetry(config.log_json)?;
    log_startup_info(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(config));
    // A blocking stdin read cannot be interrupted; don't wait for it.
    runtime.shutdown_background();
    result
}

async fn run(config: RunConfig) -> anyhow::Result<()> {
    let (tx, rx) = shared_channel(config.buffer_size);
    let feeder = tokio::spawn(async move {
        match feed_lines(tokio::io::stdin(), tx).await {
            Ok(lines) => tracing::debug!("Read {} lines from stdin", lines),
            Err(e) => tracing::error!("Failed to read stdin: {}", e),
        }
    });

    let cancel = CancellationToken::new();
    let signals = tokio::spawn(shutdown_signal(cancel.clone()));

    let processor = CommandProcessor::new(config.program, config.args);
    let outcome = Coordinator::new(rx, processor, config.pool)
        .spawn(cancel)
        .await?;

    feeder.abort();
    signals.abort();

    match outcome {
        Ok(()) => {
            tracing::info!("All workers finished");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

fn log_startup_info(config: &RunConfig) {
    if cfg!(debug_assertions) {
        tracing::debug!("Starting with full config: {:#?}", config);
    }
    tracing::info!(
        "Running `{}` with {} workers",
        config.program,
        config.pool.concurrency()
    );
}

/// Cancels the pool on `Ctrl+C` or `SIGTERM`.
///
/// A signal whose handler cannot be installed is logged and then never
/// fires; the other one still works.
async fn shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Shutdown signal received, letting running commands finish...");
    cancel.cancel();
}
