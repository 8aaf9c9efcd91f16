// packages/engine/src/observability/mod.rs
//! Logging and metrics
//!
//! - **Tracing**: `tracing-subscriber` with an `EnvFilter`; `RUST_LOG` wins
//!   over configuration when set
//! - **Metrics**: counters and gauges via `metrics`, exported over HTTP in
//!   Prometheus format when a listen address is configured

pub mod job_metrics;

use crate::utils::config::{LogFormat, LoggingConfig, MetricsConfig};
use crate::utils::errors::{EngineError, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Crates whose verbosity `--debug` raises
const OWN_TARGETS: [&str; 2] = ["mangabatch_engine", "manga_batch_downloader"];

/// Filter directive used when `RUST_LOG` is unset
pub fn filter_directive(config: &LoggingConfig) -> String {
    let mut directives = vec![config.level.clone()];
    
    if config.debug {
        for target in OWN_TARGETS {
            directives.push(format!("{}=debug", target));
        }
    }
    
    directives.join(",")
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return EnvFilter::try_from_default_env()
            .map_err(|e| EngineError::ConfigError(format!("Invalid RUST_LOG: {}", e)));
    }
    
    let directive = filter_directive(config);
    EnvFilter::try_new(&directive).map_err(|e| {
        EngineError::ConfigError(format!("Invalid log filter '{}': {}", directive, e))
    })
}

/// Install the global tracing subscriber
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug);
    
    let installed = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    
    installed.map_err(|e| {
        EngineError::ConfigError(format!("Failed to install tracing subscriber: {}", e))
    })
}

/// Install the Prometheus exporter if configured
pub fn init_metrics(config: &MetricsConfig) -> Result<()> {
    let Some(addr) = config.listen else {
        return Ok(());
    };
    
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| EngineError::ConfigError(format!("Failed to start metrics exporter: {}", e)))?;
    
    // Descriptions only stick to the recorder installed at call time
    job_metrics::describe();
    
    info!("Serving Prometheus metrics on http://{}/metrics", addr);
    Ok(())
}
