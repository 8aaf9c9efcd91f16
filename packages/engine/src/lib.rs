// packages/engine/src/lib.rs
//! Manga Batch Engine Library
//!
//! This library runs batches of manga downloads as isolated worker
//! containers, a bounded number at a time.
//!
//! # Architecture
//!
//! The engine is structured into several key modules:
//!
//! - **jobs**: Manifest loading, worker naming, launch templates
//! - **runtime**: Container runtime gateway, dispatch loop, reconciliation
//! - **routing**: Optional anonymizing proxy network for workers
//! - **executor**: End-to-end batch sequencing
//! - **observability**: Tracing and metrics
//! - **cli**: Command-line surface
//! - **utils**: Configuration and errors

// Public module exports
pub mod cli;
pub mod executor;
pub mod jobs;
pub mod observability;
pub mod routing;
pub mod runtime;
pub mod utils;

// Re-export commonly used types
pub use executor::BatchExecutor;
pub use runtime::dispatcher::{DispatchConfig, Dispatcher, RunSummary};
pub use runtime::gateway::{ContainerRuntime, DockerCli};
pub use utils::config::EngineConfig;
pub use utils::errors::{EngineError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");

/// Engine build information
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            git_hash: GIT_HASH,
            build_timestamp: env!("BUILD_TIMESTAMP"),
            rustc_version: env!("RUSTC_VERSION"),
        }
    }
}
