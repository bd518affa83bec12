#![doc = include_str!("../README.md")]

mod bridge;
mod config;
mod telemetry;

use bridge::run_bridge;
use clap::Parser;
use config::CliArgs;
use telemetry::init_telemetry;
use tokio::{io::BufReader, signal};
use wavecache::{
    DirectoryStorageManager, HttpWaveformService, WaveformWorker, WorkerConfig,
    open_result_backend,
};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = WorkerConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let manager = DirectoryStorageManager::new(config.cache_dir.clone());
    let (backend, outcome) = open_result_backend(&config, &manager);
    tracing::info!("Result table ready ({outcome:?})");

    let service = HttpWaveformService::new(config.request_timeout)?;
    let handle = WaveformWorker::spawn(&config, service, backend)?;

    let input = BufReader::new(tokio::io::stdin());
    let result = tokio::select! {
        res = run_bridge(handle.clone(), input, tokio::io::stdout()) => {
            tracing::info!("Input closed");
            res.map(drop)
        },
        () = shutdown_signal() => Ok(()),
    };

    if let Err(e) = handle.shutdown().await {
        tracing::error!("Error during worker shutdown: {e}");
    }
    providers.shutdown();

    result
}

fn log_startup_info(config: &WorkerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting waveform worker with full config: {config:#?}");
    } else {
        tracing::info!(
            "Starting waveform worker (cache dir {}, persistence {})",
            config.cache_dir.display(),
            config.use_persistence
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
}
