// packages/engine/src/executor.rs
//! Batch execution
//!
//! Sequences one run end to end: manifest, runtime checks, worker image,
//! optional proxy bootstrap, then the dispatch loop. Setup failures are
//! returned as errors; per-job failures only show up in the summary.

use crate::jobs::{self, WorkerTemplate};
use crate::routing::{ProxyBootstrapper, Transport};
use crate::runtime::dispatcher::{DispatchConfig, Dispatcher, RunSummary};
use crate::runtime::gateway::ContainerRuntime;
use crate::utils::config::EngineConfig;
use crate::utils::errors::Result;
use tracing::{info, info_span, Instrument};
use ulid::Ulid;

/// Runs one batch against a container runtime
pub struct BatchExecutor<'a, R: ContainerRuntime> {
    runtime: &'a R,
    config: &'a EngineConfig,
}

impl<'a, R: ContainerRuntime> BatchExecutor<'a, R> {
    pub fn new(runtime: &'a R, config: &'a EngineConfig) -> Self {
        Self { runtime, config }
    }
    
    /// Execute the batch described by the configuration
    pub async fn run(&self) -> Result<RunSummary> {
        let run_id = Ulid::new();
        self.run_inner(run_id)
            .instrument(info_span!("batch", run_id = %run_id))
            .await
    }
    
    async fn run_inner(&self, run_id: Ulid) -> Result<RunSummary> {
        let identifiers = jobs::load(&self.config.jobs.manifest).await?;
        
        if identifiers.is_empty() {
            info!(
                "No URLs provided in {}, nothing to do",
                self.config.jobs.manifest.display()
            );
            return Ok(RunSummary::empty(run_id));
        }
        
        let version = self.runtime.ping().await?;
        info!("Container runtime reachable (server {})", version);
        
        self.runtime.ensure_image(&self.config.jobs.worker_image).await?;
        
        let transport = if self.config.jobs.anonymize {
            let mut bootstrapper = ProxyBootstrapper::new(self.config.proxy.clone());
            Transport::Proxied(bootstrapper.ensure(self.runtime).await?)
        } else {
            Transport::Direct
        };
        
        let template = WorkerTemplate::from_config(self.config)?.with_transport(transport);
        let batch = jobs::plan_batch(identifiers);
        
        let dispatcher = Dispatcher::new(
            self.runtime,
            DispatchConfig::from_config(self.config),
            template,
        )?
        .with_run_id(run_id);
        
        dispatcher.run(batch).await
    }
}
