// packages/engine/src/jobs/mod.rs
//! Work items and the identities of the workers that process them
//!
//! - **Manifest**: line-delimited job identifiers (manga URLs)
//! - **Identity**: runtime-legal worker names derived from identifiers
//! - **Command**: the launch template applied to every job

pub mod command;
pub mod identity;
pub mod manifest;

use std::fmt;

pub use command::{WorkerTemplate, DEFAULT_MOUNT_TARGET, DEFAULT_WORKER_FLAGS, DEFAULT_WORKER_IMAGE};
pub use identity::{derive, plan_batch, WorkerIdentity, IDENTITY_PREFIX};
pub use manifest::{load, parse};

/// A job identifier read from the manifest (a manga source URL)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobIdentifier(String);

impl JobIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
    
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A job ready for dispatch: the identifier paired with its worker name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub identifier: JobIdentifier,
    pub identity: WorkerIdentity,
}
