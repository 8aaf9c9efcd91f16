// packages/engine/src/routing/transport.rs
//! Transport selection for worker launches

use crate::runtime::gateway::LaunchSpec;

/// Proxy variables understood by the worker's HTTP client
const PROXY_ENV_VARS: [&str; 3] = ["ALL_PROXY", "HTTP_PROXY", "HTTPS_PROXY"];

/// Route through the anonymizing proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRoute {
    /// Network shared by the proxy and the workers
    pub network: String,
    
    /// Proxy URL as seen from inside the network
    pub proxy_url: String,
}

impl ProxyRoute {
    /// Route to a proxy container reachable by name on `network`.
    ///
    /// `socks5h` makes the proxy resolve hostnames too, so DNS does not
    /// leak around it.
    pub fn new(network: impl Into<String>, proxy_host: &str, port: u16) -> Self {
        Self {
            network: network.into(),
            proxy_url: format!("socks5h://{}:{}", proxy_host, port),
        }
    }
}

/// How worker traffic leaves the host
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Transport {
    /// Runtime default network
    #[default]
    Direct,
    
    /// Through the anonymizing proxy
    Proxied(ProxyRoute),
}

impl Transport {
    pub fn is_proxied(&self) -> bool {
        matches!(self, Transport::Proxied(_))
    }
    
    /// Wire a launch for this transport
    pub fn apply(&self, spec: &mut LaunchSpec) {
        match self {
            Transport::Direct => {}
            Transport::Proxied(route) => {
                spec.network = Some(route.network.clone());
                for key in PROXY_ENV_VARS {
                    spec.env_vars.push((key.to_string(), route.proxy_url.clone()));
                }
            }
        }
    }
}
