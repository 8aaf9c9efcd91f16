// packages/engine/src/runtime/reconciler.rs
//! Lifecycle reconciliation for in-flight workers
//!
//! Each pass queries the runtime for every tracked worker and drops the
//! ones that exited or vanished. Workers run with auto-remove, so the
//! common case for a finished worker is `NotFound`, not `Exited`.
//!
//! A failed status query never frees a slot on its own. Only after
//! `failure_limit` consecutive failures is the worker given up as lost,
//! which keeps the final drain from spinning forever on a broken runtime.

use crate::jobs::WorkerIdentity;
use crate::runtime::gateway::{ContainerRuntime, WorkerHandle, WorkerStatus};
use crate::runtime::in_flight::InFlightSet;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{error, trace, warn};

/// Why a worker left the in-flight set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// Observed in an exited state
    Exited,
    
    /// Already removed by the runtime
    Removed,
    
    /// Status could not be determined for too long
    Lost,
}

/// A worker observed leaving the in-flight set
#[derive(Debug, Clone)]
pub struct Completion {
    pub handle: WorkerHandle,
    pub reason: CompletionReason,
    pub observed_at: DateTime<Utc>,
}

impl Completion {
    /// Time between launch and observed completion
    pub fn elapsed(&self) -> chrono::Duration {
        self.observed_at - self.handle.launched_at
    }
}

/// Removes finished workers from the in-flight set
#[derive(Debug)]
pub struct Reconciler {
    /// Consecutive status failures before a worker is dropped
    failure_limit: u32,
    
    /// Consecutive status failures per worker
    failures: HashMap<WorkerIdentity, u32>,
}

impl Reconciler {
    /// Create a reconciler; a `failure_limit` of 0 is treated as 1
    pub fn new(failure_limit: u32) -> Self {
        Self {
            failure_limit: failure_limit.max(1),
            failures: HashMap::new(),
        }
    }
    
    /// Run one pass over `in_flight`.
    ///
    /// Idempotent: workers reporting `Running` are never removed and a
    /// removed worker is never re-added.
    pub async fn reconcile<R: ContainerRuntime>(
        &mut self,
        runtime: &R,
        in_flight: &mut InFlightSet,
    ) -> Vec<Completion> {
        let mut completions = Vec::new();
        
        for identity in in_flight.identities() {
            let reason = match runtime.status(&identity).await {
                Ok(WorkerStatus::Running) => {
                    trace!("Worker '{}' still running", identity);
                    self.failures.remove(&identity);
                    continue;
                }
                Ok(WorkerStatus::Exited) => CompletionReason::Exited,
                Ok(WorkerStatus::NotFound) => CompletionReason::Removed,
                Err(e) => {
                    let count = self.failures.entry(identity.clone()).or_insert(0);
                    *count += 1;
                    
                    if *count < self.failure_limit {
                        warn!(
                            "Status query for '{}' failed ({}/{}): {}",
                            identity, count, self.failure_limit, e
                        );
                        continue;
                    }
                    
                    error!(
                        "Giving up on '{}' after {} failed status queries: {}",
                        identity, count, e
                    );
                    CompletionReason::Lost
                }
            };
            
            self.failures.remove(&identity);
            
            if let Some(handle) = in_flight.remove(&identity) {
                completions.push(Completion {
                    handle,
                    reason,
                    observed_at: Utc::now(),
                });
            }
        }
        
        completions
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(12)
    }
}
