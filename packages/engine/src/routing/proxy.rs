// packages/engine/src/routing/proxy.rs
//! Anonymizing proxy bootstrap
//!
//! Runs once before the first anonymized launch:
//! 1. If a container with the proxy's name is running, done
//! 2. Otherwise create the proxy network if it is missing
//! 3. Launch the proxy container on that network
//!
//! The proxy is never torn down here; later runs reuse it. Any failure is
//! fatal for an anonymized run, there is no silent fallback to direct
//! traffic.
//!
//! # Limits
//!
//! The proxy network is an ordinary bridge network with a route to the
//! internet, because the proxy itself needs one. Routing is advisory:
//! workers are steered through the proxy only by the `ALL_PROXY`,
//! `HTTP_PROXY` and `HTTPS_PROXY` variables. A worker whose HTTP client
//! ignores them connects directly and is not anonymized.

use crate::jobs::WorkerIdentity;
use crate::routing::transport::ProxyRoute;
use crate::runtime::gateway::{ContainerRuntime, LaunchSpec};
use crate::utils::config::ProxyConfig;
use crate::utils::errors::{EngineError, Result};
use tracing::{debug, info};

/// What the bootstrapper knows to exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyState {
    pub network_ready: bool,
    pub proxy_ready: bool,
}

/// Ensures the proxy network and container exist
#[derive(Debug)]
pub struct ProxyBootstrapper {
    config: ProxyConfig,
    state: ProxyState,
}

impl ProxyBootstrapper {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            state: ProxyState::default(),
        }
    }
    
    pub fn state(&self) -> ProxyState {
        self.state
    }
    
    /// Route workers take once the proxy is up
    pub fn route(&self) -> ProxyRoute {
        ProxyRoute::new(&self.config.network, &self.config.container_name, self.config.port)
    }
    
    /// Bring up network and proxy if needed.
    ///
    /// Idempotent: once ready, later calls make no runtime calls at all.
    pub async fn ensure<R: ContainerRuntime>(&mut self, runtime: &R) -> Result<ProxyRoute> {
        if self.state.proxy_ready {
            debug!("Proxy '{}' already bootstrapped", self.config.container_name);
            return Ok(self.route());
        }
        
        let name = WorkerIdentity::new(&self.config.container_name)
            .map_err(|e| EngineError::ProxyBootstrapFailed(e.to_string()))?;
        
        let running = runtime
            .list_running(Some(name.as_str()))
            .await
            .map_err(|e| bootstrap_failed("listing running containers", e))?;
        
        // The runtime's name filter is a substring match
        if running.iter().any(|handle| handle.identity == name) {
            info!("Proxy '{}' already running", name);
            self.state = ProxyState {
                network_ready: true,
                proxy_ready: true,
            };
            return Ok(self.route());
        }
        
        self.ensure_network(runtime).await?;
        
        runtime
            .ensure_image(&self.config.image)
            .await
            .map_err(|e| bootstrap_failed("pulling proxy image", e))?;
        
        let mut spec = LaunchSpec::new(&self.config.image, name);
        spec.network = Some(self.config.network.clone());
        spec.exposed_ports.push(self.config.port);
        
        let handle = runtime
            .launch(&spec)
            .await
            .map_err(|e| bootstrap_failed("launching proxy", e))?;
        
        info!(
            "Started proxy '{}' on network '{}' port {} with ID: {}",
            handle.identity, self.config.network, self.config.port, handle.runtime_id
        );
        
        self.state.proxy_ready = true;
        Ok(self.route())
    }
    
    async fn ensure_network<R: ContainerRuntime>(&mut self, runtime: &R) -> Result<()> {
        if self.state.network_ready {
            return Ok(());
        }
        
        let exists = runtime
            .network_exists(&self.config.network)
            .await
            .map_err(|e| bootstrap_failed("inspecting network", e))?;
        
        if !exists {
            info!("Creating network '{}'", self.config.network);
            runtime
                .create_network(&self.config.network)
                .await
                .map_err(|e| bootstrap_failed("creating network", e))?;
        }
        
        self.state.network_ready = true;
        Ok(())
    }
}

fn bootstrap_failed(step: &str, err: EngineError) -> EngineError {
    EngineError::ProxyBootstrapFailed(format!("{}: {}", step, err))
}
