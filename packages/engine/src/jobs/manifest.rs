// packages/engine/src/jobs/manifest.rs
//! Manifest loading
//!
//! One job identifier per line. Surrounding whitespace is trimmed, blank
//! lines and `#` comment lines are skipped, order is preserved.

use crate::jobs::JobIdentifier;
use crate::utils::errors::{EngineError, Result};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Load job identifiers from a manifest file.
///
/// A missing file is `ManifestNotFound`. An existing file without any job
/// lines yields an empty list, which callers treat as a no-op run.
pub async fn load(path: &Path) -> Result<Vec<JobIdentifier>> {
    let contents = fs::read_to_string(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => EngineError::ManifestNotFound(path.to_path_buf()),
        _ => EngineError::Io(e),
    })?;
    
    let jobs = parse(&contents);
    debug!("Loaded {} job(s) from {}", jobs.len(), path.display());
    
    Ok(jobs)
}

/// Parse manifest contents into job identifiers
pub fn parse(contents: &str) -> Vec<JobIdentifier> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(JobIdentifier::new)
        .collect()
}
