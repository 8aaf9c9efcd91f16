// packages/engine/src/runtime/gateway.rs
//! Capability boundary over the container runtime
//!
//! Everything the engine needs from the runtime goes through the
//! [`ContainerRuntime`] trait: image presence, detached launches, status
//! queries, name-filtered listing and network management. [`DockerCli`] is
//! the production implementation and drives the `docker` client binary.

use crate::jobs::WorkerIdentity;
use crate::runtime::process_manager::{Invocation, ProcessManager};
use crate::utils::config::RuntimeSettings;
use crate::utils::errors::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// A launched, detached worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    /// Worker name
    pub identity: WorkerIdentity,
    
    /// Runtime-assigned container id
    pub runtime_id: String,
    
    /// When the launch was acknowledged
    pub launched_at: DateTime<Utc>,
}

/// Observed state of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Running,
    Exited,
    /// Exited and already removed (auto-remove), or never existed
    NotFound,
}

impl WorkerStatus {
    /// Whether the worker still occupies a concurrency slot
    pub fn is_active(&self) -> bool {
        matches!(self, WorkerStatus::Running)
    }
}

/// Host directory bind-mounted into a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

impl Mount {
    pub fn read_write(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }
    
    fn to_volume_arg(&self) -> String {
        let mode = if self.read_only { "ro" } else { "rw" };
        format!("{}:{}:{}", self.source.display(), self.target, mode)
    }
}

/// Everything needed to start one detached worker.
///
/// Arguments stay discrete tokens all the way to the runtime; nothing is
/// ever joined into a shell string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Image reference
    pub image: String,
    
    /// Container name
    pub name: WorkerIdentity,
    
    /// Arguments passed to the image entrypoint
    pub args: Vec<String>,
    
    /// Bind mounts
    pub mounts: Vec<Mount>,
    
    /// Network to attach to (runtime default when `None`)
    pub network: Option<String>,
    
    /// Environment variables
    pub env_vars: Vec<(String, String)>,
    
    /// Container ports exposed on the attached network
    pub exposed_ports: Vec<u16>,
    
    /// Remove the container once its process exits
    pub auto_remove: bool,
}

impl LaunchSpec {
    pub fn new(image: impl Into<String>, name: WorkerIdentity) -> Self {
        Self {
            image: image.into(),
            name,
            args: vec![],
            mounts: vec![],
            network: None,
            env_vars: vec![],
            exposed_ports: vec![],
            auto_remove: true,
        }
    }
}

/// Operations the engine needs from a container runtime
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    /// Verify the runtime is installed and reachable; returns its version
    async fn ping(&self) -> Result<String>;
    
    /// Pull `image` unless it is already present locally
    async fn ensure_image(&self, image: &str) -> Result<()>;
    
    /// Start a detached worker
    async fn launch(&self, spec: &LaunchSpec) -> Result<WorkerHandle>;
    
    /// Current status of a worker by name
    async fn status(&self, identity: &WorkerIdentity) -> Result<WorkerStatus>;
    
    /// Running workers whose name matches `name_filter` (all when `None`)
    async fn list_running(&self, name_filter: Option<&str>) -> Result<Vec<WorkerHandle>>;
    
    /// Whether a network with this exact name exists
    async fn network_exists(&self, name: &str) -> Result<bool>;
    
    /// Create a network
    async fn create_network(&self, name: &str) -> Result<()>;
}

/// Row of `docker ps --format '{{json .}}'`
#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "ID")]
    id: String,
    
    #[serde(rename = "Names")]
    names: String,
    
    #[serde(rename = "CreatedAt", default)]
    created_at: String,
}

/// [`ContainerRuntime`] backed by the `docker` command-line client
pub struct DockerCli {
    /// Subprocess runner
    processes: ProcessManager,
    
    /// Client binary name or path
    binary: String,
    
    /// Deadline for image pulls (much longer than other calls)
    pull_timeout: Duration,
}

impl DockerCli {
    /// Create a client from runtime settings
    pub fn new(settings: &RuntimeSettings) -> Self {
        Self {
            processes: ProcessManager::new(Duration::from_secs(settings.command_timeout_secs)),
            binary: settings.docker_binary.clone(),
            pull_timeout: Duration::from_secs(settings.pull_timeout_secs),
        }
    }
    
    fn docker<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(&self.binary, args)
    }
    
    /// Build the `docker run` argument list for a launch spec
    pub fn run_args(spec: &LaunchSpec) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--detach".to_string()];
        
        args.push("--name".into());
        args.push(spec.name.to_string());
        
        if spec.auto_remove {
            args.push("--rm".into());
        }
        
        if let Some(network) = &spec.network {
            args.push("--network".into());
            args.push(network.clone());
        }
        
        for mount in &spec.mounts {
            args.push("--volume".into());
            args.push(mount.to_volume_arg());
        }
        
        for (key, value) in &spec.env_vars {
            args.push("--env".into());
            args.push(format!("{}={}", key, value));
        }
        
        for port in &spec.exposed_ports {
            args.push("--expose".into());
            args.push(port.to_string());
        }
        
        args.push(spec.image.clone());
        args.extend(spec.args.iter().cloned());
        args
    }
}

/// Map a container state (`running`, `exited`, ...) to a worker status
pub fn parse_state(state: &str) -> WorkerStatus {
    match state.trim() {
        "exited" | "dead" | "removing" => WorkerStatus::Exited,
        _ => WorkerStatus::Running,
    }
}

/// `name=` filter matching exactly one container.
///
/// The filter value is a regular expression and stored names carry a
/// leading `/`. `.` is the only legal name character that needs escaping.
fn exact_name_filter(identity: &WorkerIdentity) -> String {
    format!("name=^/?{}$", identity.as_str().replace('.', r"\."))
}

/// Map `docker ps --format {{.State}}` output; no row means no container
fn parse_ps_state(stdout: &str) -> WorkerStatus {
    match stdout.lines().map(str::trim).find(|line| !line.is_empty()) {
        Some(state) => parse_state(state),
        None => WorkerStatus::NotFound,
    }
}

fn is_missing_object(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no such object")
        || stderr.contains("no such container")
        || stderr.contains("no such network")
        || stderr.contains("not found")
}

/// Parse `CreatedAt` as printed by `docker ps`, e.g.
/// `2024-05-01 10:20:30 +0000 UTC`
fn parse_created_at(value: &str) -> Option<DateTime<Utc>> {
    let without_zone_name = value.trim().rsplit_once(' ').map(|(head, _)| head)?;
    DateTime::parse_from_str(without_zone_name, "%Y-%m-%d %H:%M:%S %z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse line-delimited JSON rows from `docker ps`
fn parse_ps_output(stdout: &str) -> Result<Vec<WorkerHandle>> {
    let mut handles = Vec::new();
    
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let entry: PsEntry = serde_json::from_str(line)?;
        
        // A container attached to links can list several comma separated names
        let name = entry.names.split(',').next().unwrap_or_default().trim();
        let identity = WorkerIdentity::new(name)
            .map_err(|_| EngineError::ParseError(format!("unexpected container name '{}'", name)))?;
        
        handles.push(WorkerHandle {
            identity,
            runtime_id: entry.id,
            launched_at: parse_created_at(&entry.created_at).unwrap_or_else(Utc::now),
        });
    }
    
    Ok(handles)
}

impl ContainerRuntime for DockerCli {
    async fn ping(&self) -> Result<String> {
        let unavailable = |e: EngineError| match e {
            EngineError::RuntimeUnavailable(_) => e,
            other => EngineError::RuntimeUnavailable(other.to_string()),
        };
        
        // Installed?
        self.processes
            .run_checked(&self.docker(["--version"]))
            .await
            .map_err(unavailable)?;
        
        // Daemon up?
        let version = self
            .processes
            .run_checked(&self.docker(["info", "--format", "{{.ServerVersion}}"]))
            .await
            .map_err(unavailable)?;
        
        Ok(version.stdout.trim().to_string())
    }
    
    async fn ensure_image(&self, image: &str) -> Result<()> {
        let inspect = self
            .processes
            .run(&self.docker(["image", "inspect", "--format", "{{.Id}}", image]))
            .await?;
        
        if inspect.success {
            debug!("Image '{}' present locally", image);
            return Ok(());
        }
        
        info!("Image '{}' not found locally, pulling from registry...", image);
        
        let pull = self
            .processes
            .run_with_timeout(&self.docker(["pull", image]), self.pull_timeout)
            .await
            .map_err(|e| EngineError::ImagePullFailed {
                image: image.to_string(),
                reason: e.to_string(),
            })?;
        
        if !pull.success {
            return Err(EngineError::ImagePullFailed {
                image: image.to_string(),
                reason: pull.stderr.trim().to_string(),
            });
        }
        
        info!("Successfully pulled '{}'", image);
        Ok(())
    }
    
    async fn launch(&self, spec: &LaunchSpec) -> Result<WorkerHandle> {
        let output = self.processes.run(&self.docker(Self::run_args(spec))).await?;
        
        if !output.success {
            return Err(EngineError::LaunchFailed {
                name: spec.name.to_string(),
                reason: output.stderr.trim().to_string(),
            });
        }
        
        Ok(WorkerHandle {
            identity: spec.name.clone(),
            runtime_id: output.stdout.trim().to_string(),
            launched_at: Utc::now(),
        })
    }
    
    async fn status(&self, identity: &WorkerIdentity) -> Result<WorkerStatus> {
        // Containers only, exact name: plain `inspect` also resolves images,
        // networks, volumes and id prefixes
        let filter = exact_name_filter(identity);
        let output = self
            .processes
            .run(&self.docker(["ps", "--all", "--filter", filter.as_str(), "--format", "{{.State}}"]))
            .await?;
        
        if !output.success {
            return Err(EngineError::StatusQueryFailed {
                name: identity.to_string(),
                reason: output.stderr.trim().to_string(),
            });
        }
        
        Ok(parse_ps_state(&output.stdout))
    }
    
    async fn list_running(&self, name_filter: Option<&str>) -> Result<Vec<WorkerHandle>> {
        let mut args = vec!["ps".to_string()];
        if let Some(filter) = name_filter {
            args.push("--filter".into());
            args.push(format!("name={}", filter));
        }
        args.push("--format".into());
        args.push("{{json .}}".into());
        
        let output = self.processes.run_checked(&self.docker(args)).await?;
        parse_ps_output(&output.stdout)
    }
    
    async fn network_exists(&self, name: &str) -> Result<bool> {
        let output = self
            .processes
            .run(&self.docker(["network", "inspect", "--format", "{{.Name}}", name]))
            .await?;
        
        if output.success {
            Ok(true)
        } else if is_missing_object(&output.stderr) {
            Ok(false)
        } else {
            Err(EngineError::CommandFailed {
                command: format!("{} network inspect {}", self.binary, name),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
    
    async fn create_network(&self, name: &str) -> Result<()> {
        self.processes
            .run_checked(&self.docker(["network", "create", name]))
            .await?;
        
        info!("Created network '{}'", name);
        Ok(())
    }
}
