// packages/engine/src/jobs/identity.rs
//! Worker identity derivation
//!
//! Container names must match `[a-zA-Z0-9][a-zA-Z0-9_.-]+`. A worker is
//! named after the final path segment of its job identifier, e.g.
//! `https://mangadex.org/title/<uuid>/frieren` becomes `frieren`. Some
//! slugs start with `-` (Oshi no Ko), those get a fixed prefix.

use crate::jobs::{Job, JobIdentifier};
use crate::utils::errors::{EngineError, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::warn;

/// Prefix prepended to names that would not start with an alphanumeric
pub const IDENTITY_PREFIX: &str = "something";

/// Runtime-legal worker (container) name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerIdentity(String);

impl WorkerIdentity {
    /// Wrap a name reported by, or destined for, the runtime.
    ///
    /// Rejects names the runtime would refuse.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if is_legal(&name) {
            Ok(Self(name))
        } else {
            Err(EngineError::ConfigError(format!(
                "'{}' is not a valid worker name",
                name
            )))
        }
    }
    
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn is_legal(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    name.len() >= 2 && chars.all(is_name_char)
}

/// Final path segment of an identifier, ignoring query, fragment and
/// trailing slashes
fn final_segment(identifier: &str) -> &str {
    let end = identifier.find(['?', '#']).unwrap_or(identifier.len());
    let path = identifier[..end].trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}

/// Derive the worker name for a job identifier.
///
/// Pure and total: the result is always runtime-legal. Uniqueness across
/// a batch is handled by [`plan_batch`].
pub fn derive(identifier: &JobIdentifier) -> WorkerIdentity {
    let segment: String = final_segment(identifier.as_str())
        .chars()
        .map(|c| if is_name_char(c) { c } else { '-' })
        .collect();
    
    let starts_alnum = segment
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric());
    
    if starts_alnum && segment.len() >= 2 {
        WorkerIdentity(segment)
    } else {
        WorkerIdentity(format!("{}{}", IDENTITY_PREFIX, segment))
    }
}

/// Pair every identifier with a worker name that is unique within the batch.
///
/// Colliding names get `-2`, `-3`, ... appended in manifest order.
pub fn plan_batch(identifiers: Vec<JobIdentifier>) -> Vec<Job> {
    let mut used: HashSet<String> = HashSet::with_capacity(identifiers.len());
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    let mut jobs = Vec::with_capacity(identifiers.len());
    
    for identifier in identifiers {
        let base = derive(&identifier);
        
        let identity = if used.contains(base.as_str()) {
            let mut n = next_suffix.get(base.as_str()).copied().unwrap_or(2);
            let candidate = loop {
                let candidate = format!("{}-{}", base, n);
                n += 1;
                if !used.contains(&candidate) {
                    break candidate;
                }
            };
            next_suffix.insert(base.0.clone(), n);
            
            warn!(
                "Worker name '{}' already used in this batch, '{}' will run as '{}'",
                base, identifier, candidate
            );
            WorkerIdentity(candidate)
        } else {
            base
        };
        
        used.insert(identity.0.clone());
        jobs.push(Job { identifier, identity });
    }
    
    jobs
}
