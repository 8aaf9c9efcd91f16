// packages/engine/src/main.rs
//! Manga Batch Downloader
//!
//! Downloads every manga listed in a manifest by launching one detached
//! downloader container per URL, never more than `--max-containers` at once.

use anyhow::Result;
use clap::Parser;
use mangabatch_engine::cli::Cli;
use mangabatch_engine::observability::{init_metrics, init_tracing};
use mangabatch_engine::{BatchExecutor, BuildInfo, DockerCli};
use tracing::{debug, error, info, warn};

/// Exit code after Ctrl-C, as a shell would report SIGINT
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    
    // Load configuration
    let config = cli.resolve_config()?;
    
    // Initialize observability (tracing, metrics)
    init_tracing(&config.logging)?;
    init_metrics(&config.metrics)?;
    
    let build = BuildInfo::current();
    info!("Starting manga batch downloader v{} ({})", build.version, build.git_hash);
    debug!("Configuration loaded: {:?}", config);
    
    let runtime = DockerCli::new(&config.runtime);
    let executor = BatchExecutor::new(&runtime, &config);
    
    // No cancellation: launched workers are detached and keep running
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };
    
    tokio::select! {
        // A fatal error is reported once, by anyhow on the way out
        outcome = executor.run() => {
            let summary = outcome?;
            summary.log();
            Ok(())
        }
        _ = interrupted => {
            warn!("Interrupted; workers already launched keep running detached");
            std::process::exit(EXIT_INTERRUPTED);
        }
    }
}
