// packages/engine/src/utils/config.rs
//! Engine configuration
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file (`mangabatch.toml`, or `--config <path>`)
//! 3. Environment, e.g. `MANGABATCH__JOBS__MAX_CONCURRENCY=8`
//! 4. Command-line flags (applied by the binary)
//!
//! The result is validated once and treated as read-only afterwards.

use crate::jobs::command::{DEFAULT_MOUNT_TARGET, DEFAULT_WORKER_FLAGS, DEFAULT_WORKER_IMAGE};
use crate::utils::errors::{EngineError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "mangabatch.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "MANGABATCH";

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub jobs: JobsConfig,
    pub runtime: RuntimeSettings,
    pub proxy: ProxyConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// What to run and where results go
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Manifest of job identifiers, one per line
    pub manifest: PathBuf,
    
    /// Host directory receiving downloads (required)
    pub export_dir: Option<PathBuf>,
    
    /// Maximum simultaneously running workers
    pub max_concurrency: usize,
    
    /// Route workers through the anonymizing proxy
    pub anonymize: bool,
    
    /// Worker image reference
    pub worker_image: String,
    
    /// Flags appended after the job identifier
    pub worker_flags: Vec<String>,
    
    /// Export directory mount point inside workers
    pub mount_target: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("assets/manga-list.txt"),
            export_dir: None,
            max_concurrency: 4,
            anonymize: false,
            worker_image: DEFAULT_WORKER_IMAGE.to_string(),
            worker_flags: DEFAULT_WORKER_FLAGS.iter().map(|s| s.to_string()).collect(),
            mount_target: DEFAULT_MOUNT_TARGET.to_string(),
        }
    }
}

/// Container runtime client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Runtime client binary
    pub docker_binary: String,
    
    /// Delay between reconciliation passes while waiting for a slot
    pub poll_interval_ms: u64,
    
    /// Deadline for a single runtime command
    pub command_timeout_secs: u64,
    
    /// Deadline for an image pull
    pub pull_timeout_secs: u64,
    
    /// Consecutive failed status queries before a worker is given up
    pub status_failure_limit: u32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            docker_binary: "docker".to_string(),
            poll_interval_ms: 5_000,
            command_timeout_secs: 120,
            pull_timeout_secs: 1_800,
            status_failure_limit: 12,
        }
    }
}

impl RuntimeSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Anonymizing proxy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy image reference
    pub image: String,
    
    /// Proxy container name
    pub container_name: String,
    
    /// Network shared by proxy and workers
    pub network: String,
    
    /// SOCKS listening port
    pub port: u16,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            image: "dperson/torproxy".to_string(),
            container_name: "mangabatch-tor-proxy".to_string(),
            network: "mangabatch-tor".to_string(),
            port: 9050,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// JSON lines
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    
    /// Verbose output for this crate
    pub debug: bool,
    
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug: false,
            format: LogFormat::Pretty,
        }
    }
}

/// Metrics settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve Prometheus metrics on this address when set
    pub listen: Option<SocketAddr>,
}

impl EngineConfig {
    /// Load defaults, then the config file, then environment.
    ///
    /// An explicit `path` must exist; otherwise `mangabatch.toml` is read
    /// when present.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        
        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        
        Ok(config.try_deserialize()?)
    }
    
    /// Check invariants that cannot be expressed in the types
    pub fn validate(&self) -> Result<()> {
        if self.jobs.export_dir.is_none() {
            return Err(EngineError::ConfigError(
                "an export directory is required (--export-dir)".to_string(),
            ));
        }
        
        if self.jobs.max_concurrency == 0 {
            return Err(EngineError::ConfigError(
                "max concurrency must be at least 1".to_string(),
            ));
        }
        
        if self.jobs.worker_image.trim().is_empty() {
            return Err(EngineError::ConfigError("worker image must not be empty".to_string()));
        }
        
        if self.runtime.poll_interval_ms == 0 {
            return Err(EngineError::ConfigError(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        
        if self.runtime.command_timeout_secs == 0 || self.runtime.pull_timeout_secs == 0 {
            return Err(EngineError::ConfigError(
                "runtime timeouts must be greater than zero".to_string(),
            ));
        }
        
        if self.jobs.anonymize && self.proxy.port == 0 {
            return Err(EngineError::ConfigError("proxy port must not be 0".to_string()));
        }
        
        Ok(())
    }
    
    /// Validate, then create and canonicalize the export directory so it
    /// can be bind-mounted
    pub fn prepare(mut self) -> Result<Self> {
        self.validate()?;
        
        if let Some(dir) = self.jobs.export_dir.take() {
            std::fs::create_dir_all(&dir)?;
            self.jobs.export_dir = Some(dir.canonicalize()?);
        }
        
        Ok(self)
    }
    
    /// Export directory; only meaningful after [`validate`](Self::validate)
    pub fn export_dir(&self) -> Result<&Path> {
        self.jobs.export_dir.as_deref().ok_or_else(|| {
            EngineError::ConfigError("an export directory is required (--export-dir)".to_string())
        })
    }
}
