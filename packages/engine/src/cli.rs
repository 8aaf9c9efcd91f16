// packages/engine/src/cli.rs
//! Command-line interface

use crate::utils::config::{EngineConfig, LogFormat};
use crate::utils::errors::Result;
use clap::builder::BoolishValueParser;
use clap::Parser;
use std::path::PathBuf;

/// Batch-download manga by running one downloader container per URL
#[derive(Parser, Debug)]
#[command(name = "manga-batch-downloader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Local directory to save downloaded manga to
    #[arg(long = "export-dir", value_name = "PATH")]
    pub export_dir: PathBuf,
    
    /// Path to the manga list file, one URL per line
    #[arg(long = "manga-list", value_name = "PATH")]
    pub manga_list: Option<PathBuf>,
    
    /// Maximum number of simultaneous containers. Probably fewer than the
    /// number of cores on this machine
    #[arg(long = "max-containers", value_name = "N")]
    pub max_containers: Option<usize>,
    
    /// Route downloads through the Tor proxy container
    #[arg(
        long = "torify-it",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub torify_it: Option<bool>,
    
    /// Verbose logging
    #[arg(long = "debug")]
    pub debug: bool,
    
    /// Configuration file (default: ./mangabatch.toml if present)
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
    
    /// Seconds between container status polls
    #[arg(long = "poll-interval", value_name = "SECONDS")]
    pub poll_interval: Option<f64>,
    
    /// Log output format
    #[arg(long = "log-format", value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,
}

fn parse_log_format(value: &str) -> std::result::Result<LogFormat, String> {
    match value.to_ascii_lowercase().as_str() {
        "pretty" | "text" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => Err(format!("unknown log format '{}' (expected pretty or json)", other)),
    }
}

impl Cli {
    /// Overlay flags on a loaded configuration
    pub fn apply(&self, config: &mut EngineConfig) {
        config.jobs.export_dir = Some(self.export_dir.clone());
        
        if let Some(path) = &self.manga_list {
            config.jobs.manifest = path.clone();
        }
        if let Some(max) = self.max_containers {
            config.jobs.max_concurrency = max;
        }
        if let Some(torify) = self.torify_it {
            config.jobs.anonymize = torify;
        }
        if self.debug {
            config.logging.debug = true;
        }
        if let Some(secs) = self.poll_interval {
            config.runtime.poll_interval_ms = (secs * 1000.0).round().max(0.0) as u64;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
    
    /// Load configuration layers, apply flags, validate
    pub fn resolve_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::load_from(self.config.as_deref())?;
        self.apply(&mut config);
        config.prepare()
    }
}
