// packages/engine/src/routing/mod.rs
//! Worker traffic routing
//!
//! Workers either reach the network directly or through an anonymizing
//! SOCKS proxy running as a long-lived container on a dedicated network.
//!
//! - **Transport**: how a worker launch is wired for its route
//! - **Proxy**: idempotent bootstrap of the network and proxy container
//!
//! ```text
//! worker ──(network: mangabatch-tor)──▶ mangabatch-tor-proxy:9050 ──▶ Tor
//! ```

pub mod proxy;
pub mod transport;

pub use proxy::{ProxyBootstrapper, ProxyState};
pub use transport::{ProxyRoute, Transport};
