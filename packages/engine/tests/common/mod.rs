// packages/engine/tests/common/mod.rs
//! In-memory container runtime for tests
//!
//! Containers "run" for a configurable number of status polls, then either
//! vanish (auto-remove) or linger as exited.

#![allow(dead_code)]

use chrono::Utc;
use mangabatch_engine::jobs::{JobIdentifier, WorkerIdentity};
use mangabatch_engine::runtime::{ContainerRuntime, LaunchSpec, WorkerHandle, WorkerStatus};
use mangabatch_engine::{EngineError, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;

/// Number of calls per runtime operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calls {
    pub ping: usize,
    pub ensure_image: usize,
    pub launch: usize,
    pub status: usize,
    pub list_running: usize,
    pub network_exists: usize,
    pub create_network: usize,
}

impl Calls {
    /// Calls that create something in the runtime
    pub fn mutations(&self) -> usize {
        self.launch + self.create_network
    }
}

#[derive(Debug)]
struct FakeContainer {
    id: String,
    polls_left: usize,
    exited: bool,
    auto_remove: bool,
}

#[derive(Debug, Default)]
struct State {
    containers: HashMap<String, FakeContainer>,
    networks: HashSet<String>,
    launches: Vec<LaunchSpec>,
    calls: Calls,
    next_id: usize,
    max_running: usize,
    polls_until_exit: usize,
    fail_launch: HashSet<String>,
    fail_status: HashSet<String>,
    unreachable: bool,
    launches_before_outage: Option<usize>,
    pull_fails: bool,
    network_create_fails: bool,
}

impl State {
    fn running(&self) -> usize {
        self.containers.values().filter(|c| !c.exited).count()
    }
}

/// Fake [`ContainerRuntime`]
#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    /// Workers exit after two status polls
    pub fn new() -> Self {
        let runtime = Self::default();
        runtime.state.lock().polls_until_exit = 2;
        runtime
    }
    
    pub fn with_polls_until_exit(self, polls: usize) -> Self {
        self.state.lock().polls_until_exit = polls;
        self
    }
    
    pub fn failing_launch(self, name: &str) -> Self {
        self.state.lock().fail_launch.insert(name.to_string());
        self
    }
    
    pub fn failing_status(self, name: &str) -> Self {
        self.state.lock().fail_status.insert(name.to_string());
        self
    }
    
    pub fn unreachable(self) -> Self {
        self.state.lock().unreachable = true;
        self
    }
    
    /// The daemon goes away after `count` successful launches
    pub fn outage_after_launches(self, count: usize) -> Self {
        self.state.lock().launches_before_outage = Some(count);
        self
    }
    
    pub fn pull_fails(self) -> Self {
        self.state.lock().pull_fails = true;
        self
    }
    
    pub fn network_create_fails(self) -> Self {
        self.state.lock().network_create_fails = true;
        self
    }
    
    pub fn with_network(self, name: &str) -> Self {
        self.state.lock().networks.insert(name.to_string());
        self
    }
    
    /// A long-lived container that is already running
    pub fn with_running(self, name: &str) -> Self {
        {
            let mut state = self.state.lock();
            state.containers.insert(
                name.to_string(),
                FakeContainer {
                    id: format!("pre-{}", name),
                    polls_left: usize::MAX,
                    exited: false,
                    auto_remove: true,
                },
            );
        }
        self
    }
    
    pub fn calls(&self) -> Calls {
        self.state.lock().calls
    }
    
    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.state.lock().launches.clone()
    }
    
    pub fn launched_names(&self) -> Vec<String> {
        self.launches().iter().map(|s| s.name.to_string()).collect()
    }
    
    /// Most containers ever running at the same time
    pub fn max_running(&self) -> usize {
        self.state.lock().max_running
    }
    
    pub fn running(&self) -> usize {
        self.state.lock().running()
    }
    
    pub fn has_network(&self, name: &str) -> bool {
        self.state.lock().networks.contains(name)
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<String> {
        let mut state = self.state.lock();
        state.calls.ping += 1;
        
        if state.unreachable {
            return Err(EngineError::RuntimeUnavailable(
                "Cannot connect to the Docker daemon".to_string(),
            ));
        }
        Ok("fake-24.0".to_string())
    }
    
    async fn ensure_image(&self, image: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.ensure_image += 1;
        
        if state.pull_fails {
            return Err(EngineError::ImagePullFailed {
                image: image.to_string(),
                reason: "manifest unknown".to_string(),
            });
        }
        Ok(())
    }
    
    async fn launch(&self, spec: &LaunchSpec) -> Result<WorkerHandle> {
        let mut state = self.state.lock();
        state.calls.launch += 1;
        
        if state.launches_before_outage.is_some_and(|count| state.launches.len() >= count) {
            return Err(EngineError::RuntimeUnavailable(
                "Cannot connect to the Docker daemon".to_string(),
            ));
        }
        
        let name = spec.name.to_string();
        if state.fail_launch.contains(&name) {
            return Err(EngineError::LaunchFailed {
                name,
                reason: "rejected by fake runtime".to_string(),
            });
        }
        if state.containers.contains_key(&name) {
            return Err(EngineError::LaunchFailed {
                name: name.clone(),
                reason: format!("Conflict. The container name \"/{}\" is already in use", name),
            });
        }
        
        state.next_id += 1;
        let id = format!("{:012x}", state.next_id);
        let polls_left = state.polls_until_exit;
        
        state.containers.insert(
            name,
            FakeContainer {
                id: id.clone(),
                polls_left,
                exited: false,
                auto_remove: spec.auto_remove,
            },
        );
        state.launches.push(spec.clone());
        state.max_running = state.max_running.max(state.running());
        
        Ok(WorkerHandle {
            identity: spec.name.clone(),
            runtime_id: id,
            launched_at: Utc::now(),
        })
    }
    
    async fn status(&self, identity: &WorkerIdentity) -> Result<WorkerStatus> {
        let mut state = self.state.lock();
        state.calls.status += 1;
        
        let name = identity.to_string();
        if state.fail_status.contains(&name) {
            return Err(EngineError::StatusQueryFailed {
                name,
                reason: "i/o timeout".to_string(),
            });
        }
        
        let Some(container) = state.containers.get_mut(&name) else {
            return Ok(WorkerStatus::NotFound);
        };
        
        if container.exited {
            return Ok(WorkerStatus::Exited);
        }
        
        if container.polls_left > 0 {
            container.polls_left -= 1;
            return Ok(WorkerStatus::Running);
        }
        
        if container.auto_remove {
            state.containers.remove(&name);
            Ok(WorkerStatus::NotFound)
        } else {
            container.exited = true;
            Ok(WorkerStatus::Exited)
        }
    }
    
    async fn list_running(&self, name_filter: Option<&str>) -> Result<Vec<WorkerHandle>> {
        let mut state = self.state.lock();
        state.calls.list_running += 1;
        
        let handles = state
            .containers
            .iter()
            .filter(|(name, c)| !c.exited && name_filter.map_or(true, |f| name.contains(f)))
            .map(|(name, c)| WorkerHandle {
                identity: WorkerIdentity::new(name.as_str()).expect("fake names are legal"),
                runtime_id: c.id.clone(),
                launched_at: Utc::now(),
            })
            .collect();
        
        Ok(handles)
    }
    
    async fn network_exists(&self, name: &str) -> Result<bool> {
        let mut state = self.state.lock();
        state.calls.network_exists += 1;
        Ok(state.networks.contains(name))
    }
    
    async fn create_network(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.create_network += 1;
        
        if state.network_create_fails {
            return Err(EngineError::CommandFailed {
                command: format!("docker network create {}", name),
                stderr: "permission denied".to_string(),
            });
        }
        state.networks.insert(name.to_string());
        Ok(())
    }
}

/// `https://mangadex.org/title/<n>/<slug>` for each slug
pub fn urls(slugs: &[&str]) -> Vec<String> {
    slugs
        .iter()
        .enumerate()
        .map(|(i, slug)| format!("https://mangadex.org/title/{}/{}", i, slug))
        .collect()
}

pub fn identifiers(urls: &[String]) -> Vec<JobIdentifier> {
    urls.iter().map(JobIdentifier::new).collect()
}

/// Write a manifest file with the given lines
pub fn write_manifest(dir: &Path, lines: &[String]) -> std::path::PathBuf {
    let path = dir.join("manga-list.txt");
    let mut file = std::fs::File::create(&path).expect("create manifest");
    for line in lines {
        writeln!(file, "{}", line).expect("write manifest");
    }
    path
}
