// packages/engine/src/runtime/in_flight.rs
//! Bounded set of workers believed to be running
//!
//! The dispatcher inserts on launch, the reconciler removes on completion.
//! Both run on the single control task, so the set needs no locking.
//! `len()` never exceeds the capacity given to [`InFlightSet::new`].

use crate::jobs::WorkerIdentity;
use crate::runtime::gateway::WorkerHandle;
use crate::utils::errors::{EngineError, Result};
use std::collections::HashMap;

/// Workers currently occupying a concurrency slot
#[derive(Debug)]
pub struct InFlightSet {
    workers: HashMap<WorkerIdentity, WorkerHandle>,
    capacity: usize,
    peak: usize,
}

impl InFlightSet {
    /// Create an empty set holding at most `capacity` workers
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(EngineError::ConfigError(
                "max concurrency must be at least 1".to_string(),
            ));
        }
        
        Ok(Self {
            workers: HashMap::with_capacity(capacity),
            capacity,
            peak: 0,
        })
    }
    
    pub fn len(&self) -> usize {
        self.workers.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
    
    /// Whether another worker may be launched
    pub fn has_capacity(&self) -> bool {
        self.workers.len() < self.capacity
    }
    
    /// Highest size observed since creation
    pub fn peak(&self) -> usize {
        self.peak
    }
    
    /// Track a launched worker.
    ///
    /// Hands the handle back when the set is full or the name is already
    /// tracked.
    pub fn insert(&mut self, handle: WorkerHandle) -> std::result::Result<(), WorkerHandle> {
        if !self.has_capacity() || self.workers.contains_key(&handle.identity) {
            return Err(handle);
        }
        
        self.workers.insert(handle.identity.clone(), handle);
        self.peak = self.peak.max(self.workers.len());
        Ok(())
    }
    
    /// Stop tracking a worker
    pub fn remove(&mut self, identity: &WorkerIdentity) -> Option<WorkerHandle> {
        self.workers.remove(identity)
    }
    
    /// Snapshot of tracked names, sorted for stable polling order
    pub fn identities(&self) -> Vec<WorkerIdentity> {
        let mut identities: Vec<WorkerIdentity> = self.workers.keys().cloned().collect();
        identities.sort();
        identities
    }
}
