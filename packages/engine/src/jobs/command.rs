// packages/engine/src/jobs/command.rs
//! Launch template for download workers
//!
//! Every worker runs the same image with the job identifier as its first
//! argument, followed by a fixed set of downloader flags, and writes into
//! the shared export directory mounted at `/downloads`.

use crate::jobs::Job;
use crate::routing::transport::Transport;
use crate::runtime::gateway::{LaunchSpec, Mount};
use crate::utils::config::EngineConfig;
use crate::utils::errors::Result;
use std::path::PathBuf;

/// Default worker image
pub const DEFAULT_WORKER_IMAGE: &str = "mansuf/mangadex-downloader";

/// Export directory mount point inside a worker
pub const DEFAULT_MOUNT_TARGET: &str = "/downloads";

/// Flags passed to every worker after the job identifier
pub const DEFAULT_WORKER_FLAGS: [&str; 6] = [
    "--no-group-name",
    "--use-chapter-title",
    "--delay-requests",
    "1.5",
    "--save-as",
    "cbz",
];

/// Shared settings for every job worker in a run
#[derive(Debug, Clone)]
pub struct WorkerTemplate {
    pub image: String,
    pub flags: Vec<String>,
    pub export_dir: PathBuf,
    pub mount_target: String,
    pub transport: Transport,
}

impl WorkerTemplate {
    /// Template with default image and flags writing to `export_dir`
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            image: DEFAULT_WORKER_IMAGE.to_string(),
            flags: DEFAULT_WORKER_FLAGS.iter().map(|s| s.to_string()).collect(),
            export_dir: export_dir.into(),
            mount_target: DEFAULT_MOUNT_TARGET.to_string(),
            transport: Transport::Direct,
        }
    }
    
    /// Template from a validated configuration, direct transport
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            image: config.jobs.worker_image.clone(),
            flags: config.jobs.worker_flags.clone(),
            export_dir: config.export_dir()?.to_path_buf(),
            mount_target: config.jobs.mount_target.clone(),
            transport: Transport::Direct,
        })
    }
    
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }
    
    /// Worker arguments for a job, as discrete tokens
    pub fn args(&self, job: &Job) -> Vec<String> {
        let mut args = Vec::with_capacity(self.flags.len() + 1);
        args.push(job.identifier.to_string());
        args.extend(self.flags.iter().cloned());
        args
    }
    
    /// Full launch spec for a job
    pub fn launch_spec(&self, job: &Job) -> LaunchSpec {
        let mut spec = LaunchSpec::new(&self.image, job.identity.clone());
        spec.args = self.args(job);
        spec.mounts.push(Mount::read_write(&self.export_dir, &self.mount_target));
        self.transport.apply(&mut spec);
        spec
    }
}
