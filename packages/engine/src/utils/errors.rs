// packages/engine/src/utils/errors.rs
//! Error types for the orchestration engine
//!
//! Errors fall into three groups:
//! - **Fatal setup errors**: the run cannot make progress and aborts
//! - **Per-job errors**: logged, the job is skipped, the run continues
//! - **Transient query errors**: retried on the next reconciliation pass

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine error
#[derive(Debug, Error)]
pub enum EngineError {
    /// Container runtime is not installed or not reachable
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    
    /// Required image could not be pulled
    #[error("Failed to pull image '{image}': {reason}")]
    ImagePullFailed { image: String, reason: String },
    
    /// Runtime rejected a worker launch (name collision, bad mount, ...)
    #[error("Failed to launch worker '{name}': {reason}")]
    LaunchFailed { name: String, reason: String },
    
    /// Status query for a worker failed for a reason other than "not found"
    #[error("Status query for '{name}' failed: {reason}")]
    StatusQueryFailed { name: String, reason: String },
    
    /// A runtime command did not finish within its deadline
    #[error("Runtime command '{command}' timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },
    
    /// Runtime command exited unsuccessfully
    #[error("Runtime command '{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    
    /// Manifest path does not exist
    #[error("Manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),
    
    /// Anonymization network or proxy could not be brought up
    #[error("Proxy bootstrap failed: {0}")]
    ProxyBootstrapFailed(String),
    
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
    
    /// Output of a runtime command could not be parsed
    #[error("Failed to parse runtime output: {0}")]
    ParseError(String),
    
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Whether this error must abort the whole run.
    ///
    /// Per-job launch failures, timeouts and status query failures are
    /// contained by the dispatcher; everything else is a setup failure.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EngineError::LaunchFailed { .. }
                | EngineError::StatusQueryFailed { .. }
                | EngineError::CommandTimeout { .. }
        )
    }
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_fatal_classification() {
        assert!(EngineError::RuntimeUnavailable("docker".into()).is_fatal());
        assert!(EngineError::ManifestNotFound(PathBuf::from("x.txt")).is_fatal());
        assert!(EngineError::ProxyBootstrapFailed("network".into()).is_fatal());
        
        let launch = EngineError::LaunchFailed {
            name: "a".into(),
            reason: "name in use".into(),
        };
        assert!(!launch.is_fatal());
        
        let timeout = EngineError::CommandTimeout {
            command: "docker run".into(),
            timeout: Duration::from_secs(1),
        };
        assert!(!timeout.is_fatal());
    }
    
    #[test]
    fn test_manifest_not_found_message() {
        let err = EngineError::ManifestNotFound(PathBuf::from("assets/list.txt"));
        assert_eq!(err.to_string(), "Manifest not found: assets/list.txt");
    }
}
