// packages/engine/src/runtime/dispatcher.rs
//! Dispatch loop with a concurrency gate
//!
//! Jobs are submitted in manifest order, one detached worker each. Once
//! `max_concurrency` workers are in flight, submission blocks and the
//! reconciler is polled at a fixed interval until a slot frees up. After
//! the last submission the loop keeps polling until every worker is gone.
//!
//! # Job lifecycle
//!
//! ```text
//! Pending ──▶ Launching ──▶ InFlight ──▶ Completed
//!                 │
//!                 └──(launch error)──▶ skipped, no slot consumed
//! ```
//!
//! Polling trades completion latency for simplicity; workers run for
//! minutes, so a few seconds of delay is irrelevant.

use crate::jobs::{Job, JobIdentifier, WorkerTemplate};
use crate::observability::job_metrics;
use crate::runtime::gateway::ContainerRuntime;
use crate::runtime::in_flight::InFlightSet;
use crate::runtime::reconciler::{Completion, CompletionReason, Reconciler};
use crate::utils::config::EngineConfig;
use crate::utils::errors::Result;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use ulid::Ulid;

/// Configuration for the dispatch loop
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum simultaneously running workers (default: 4)
    pub max_concurrency: usize,
    
    /// Delay between reconciliation passes (default: 5s)
    pub poll_interval: Duration,
    
    /// Consecutive failed status queries before a worker is dropped (default: 12)
    pub status_failure_limit: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            poll_interval: Duration::from_secs(5),
            status_failure_limit: 12,
        }
    }
}

impl DispatchConfig {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_concurrency: config.jobs.max_concurrency,
            poll_interval: config.runtime.poll_interval(),
            status_failure_limit: config.runtime.status_failure_limit,
        }
    }
}

/// Outcome of a batch run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Ulid,
    
    /// Jobs taken from the manifest
    pub submitted: usize,
    
    /// Workers the runtime accepted
    pub launched: usize,
    
    /// Jobs whose launch was rejected or timed out
    pub failed_to_start: usize,
    
    /// Workers observed exiting or removed
    pub completed: usize,
    
    /// Workers given up after repeated status failures
    pub lost: usize,
    
    /// Most workers in flight at once
    pub peak_in_flight: usize,
    
    /// Identifiers of jobs that never started
    pub failed_jobs: Vec<JobIdentifier>,
    
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Summary of a run that has not done anything yet
    pub fn empty(run_id: Ulid) -> Self {
        Self {
            run_id,
            submitted: 0,
            launched: 0,
            failed_to_start: 0,
            completed: 0,
            lost: 0,
            peak_in_flight: 0,
            failed_jobs: vec![],
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
        }
    }
    
    /// Emit the end-of-run summary line(s)
    pub fn log(&self) {
        info!(
            run_id = %self.run_id,
            "Batch finished in {:.1?}: {} submitted, {} launched, {} completed, {} failed to start, {} lost (peak {} in flight)",
            self.elapsed,
            self.submitted,
            self.launched,
            self.completed,
            self.failed_to_start,
            self.lost,
            self.peak_in_flight,
        );
        
        for job in &self.failed_jobs {
            warn!("Not downloaded: {}", job);
        }
    }
}

/// Drives a batch of jobs through the runtime under a concurrency cap
pub struct Dispatcher<'a, R: ContainerRuntime> {
    runtime: &'a R,
    config: DispatchConfig,
    template: WorkerTemplate,
    in_flight: InFlightSet,
    reconciler: Reconciler,
    summary: RunSummary,
    started: Instant,
}

impl<'a, R: ContainerRuntime> Dispatcher<'a, R> {
    /// Create a dispatcher; fails if `max_concurrency` is 0
    pub fn new(runtime: &'a R, config: DispatchConfig, template: WorkerTemplate) -> Result<Self> {
        let in_flight = InFlightSet::new(config.max_concurrency)?;
        let reconciler = Reconciler::new(config.status_failure_limit);
        
        Ok(Self {
            runtime,
            config,
            template,
            in_flight,
            reconciler,
            summary: RunSummary::empty(Ulid::new()),
            started: Instant::now(),
        })
    }
    
    /// Tag the summary with an existing run id
    pub fn with_run_id(mut self, run_id: Ulid) -> Self {
        self.summary.run_id = run_id;
        self
    }
    
    /// Submit every job, then wait for all workers to finish.
    ///
    /// Per-job launch errors are recorded in the summary. A fatal error
    /// (the runtime going away) aborts the run; workers already launched
    /// keep running detached.
    pub async fn run(mut self, jobs: Vec<Job>) -> Result<RunSummary> {
        let total = jobs.len();
        info!(
            "Dispatching {} job(s) with at most {} worker(s) at a time",
            total, self.config.max_concurrency
        );
        
        for (index, job) in jobs.iter().enumerate() {
            self.summary.submitted += 1;
            self.wait_for_capacity().await;
            
            debug!("[{}/{}] Launching '{}' for {}", index + 1, total, job.identity, job.identifier);
            if let Err(e) = self.launch(job).await {
                warn!(
                    "Aborting batch after {} of {} job(s); {} worker(s) keep running detached",
                    index, total, self.in_flight.len()
                );
                return Err(e);
            }
        }
        
        self.drain().await;
        Ok(self.finish())
    }
    
    /// Block until a slot is free (backpressure)
    async fn wait_for_capacity(&mut self) {
        while !self.in_flight.has_capacity() {
            tokio::time::sleep(self.config.poll_interval).await;
            self.reconcile().await;
        }
    }
    
    /// Block until nothing is in flight
    async fn drain(&mut self) {
        if !self.in_flight.is_empty() {
            info!("All jobs submitted, waiting for {} worker(s) to finish", self.in_flight.len());
        }
        
        while !self.in_flight.is_empty() {
            tokio::time::sleep(self.config.poll_interval).await;
            self.reconcile().await;
        }
    }
    
    /// Launch one job; only fatal errors are returned
    async fn launch(&mut self, job: &Job) -> Result<()> {
        let spec = self.template.launch_spec(job);
        
        match self.runtime.launch(&spec).await {
            Ok(handle) => {
                let identity = handle.identity.clone();
                let launched_at = handle.launched_at;
                let runtime_id = handle.runtime_id.clone();
                
                match self.in_flight.insert(handle) {
                    Ok(()) => {
                        self.summary.launched += 1;
                        job_metrics::record_launch(self.in_flight.len());
                        info!(
                            "Started worker '{}'{} @ {} with ID: {}",
                            identity,
                            if self.template.transport.is_proxied() { " via proxy" } else { "" },
                            launched_at.format("%H:%M:%S"),
                            runtime_id
                        );
                    }
                    Err(handle) => {
                        // Unreachable with a planned batch: names are unique
                        // and capacity is checked before launching
                        error!(
                            "Worker '{}' launched but could not be tracked ({} in flight)",
                            handle.identity,
                            self.in_flight.len()
                        );
                        self.record_failure(job);
                    }
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("Error starting worker '{}' for {}: {}", job.identity, job.identifier, e);
                self.record_failure(job);
            }
        }
        
        Ok(())
    }
    
    fn record_failure(&mut self, job: &Job) {
        self.summary.failed_to_start += 1;
        self.summary.failed_jobs.push(job.identifier.clone());
        job_metrics::record_launch_failure();
    }
    
    async fn reconcile(&mut self) {
        let completions = self
            .reconciler
            .reconcile(self.runtime, &mut self.in_flight)
            .await;
        
        for completion in completions {
            self.record_completion(&completion);
        }
    }
    
    fn record_completion(&mut self, completion: &Completion) {
        let identity = &completion.handle.identity;
        let at = completion.observed_at.format("%H:%M:%S");
        let minutes = completion.elapsed().num_seconds() as f64 / 60.0;
        
        let reason = match completion.reason {
            CompletionReason::Exited => {
                info!("Worker '{}' completed @ {} after {:.1} min", identity, at, minutes);
                self.summary.completed += 1;
                "exited"
            }
            CompletionReason::Removed => {
                info!(
                    "Worker '{}' completed and removed @ {} after {:.1} min",
                    identity, at, minutes
                );
                self.summary.completed += 1;
                "removed"
            }
            CompletionReason::Lost => {
                self.summary.lost += 1;
                "lost"
            }
        };
        
        job_metrics::record_completion(reason, self.in_flight.len());
    }
    
    fn finish(mut self) -> RunSummary {
        self.summary.peak_in_flight = self.in_flight.peak();
        self.summary.elapsed = self.started.elapsed();
        self.summary
    }
}
