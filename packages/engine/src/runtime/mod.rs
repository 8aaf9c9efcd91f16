// packages/engine/src/runtime/mod.rs
//! Worker execution runtime
//!
//! This module drives download workers through the container runtime:
//!
//! - **Gateway**: the capability boundary over the container runtime
//! - **Process Manager**: deadline-bounded runtime client invocations
//! - **Dispatcher**: manifest-order submission under a concurrency cap
//! - **In-Flight Set**: bounded set of workers occupying a slot
//! - **Reconciler**: status polling that frees slots of finished workers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Dispatcher                       │
//! │   jobs ──▶ [wait for slot] ──▶ launch ──▶ InFlight   │
//! │                  ▲                          │        │
//! │                  └──────── Reconciler ◀─────┘        │
//! └───────────────────────────┬──────────────────────────┘
//!                             │ ContainerRuntime
//!                  ┌──────────┴──────────┐
//!                  │ DockerCli (docker)  │
//!                  └─────────────────────┘
//! ```
//!
//! All parallelism is in the workers themselves; the control loop is a
//! single task and never preempts a launched worker.

pub mod dispatcher;
pub mod gateway;
pub mod in_flight;
pub mod process_manager;
pub mod reconciler;

// Re-export commonly used types
pub use dispatcher::{DispatchConfig, Dispatcher, RunSummary};
pub use gateway::{ContainerRuntime, DockerCli, LaunchSpec, Mount, WorkerHandle, WorkerStatus};
pub use in_flight::InFlightSet;
pub use process_manager::{CommandOutput, Invocation, ProcessManager};
pub use reconciler::{Completion, CompletionReason, Reconciler};
