//! Node reroll orchestration.
//!
//! This crate recycles provisioner-managed nodes one at a time so the
//! provisioner replaces them with fresh instances. It talks to the cluster
//! through [`ClusterApi`](node_reroll_cluster::ClusterApi) and to the compute
//! provider through [`ComputeProvider`](node_reroll_compute::ComputeProvider).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     RerollOrchestrator                      │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │ HealthGate  │ │NodeSelector │ │ Lifecycle           │    │
//! │  │             │ │             │ │ State Machine       │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │   Drain     │ │  Instance   │ │ ReplacementWaiter   │    │
//! │  │ Coordinator │ │ Resolver /  │ │                     │    │
//! │  │             │ │ Terminator  │ │                     │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                │                           │
//!                ▼                           ▼
//!         ┌────────────┐              ┌────────────┐
//!         │ ClusterApi │              │  Compute   │
//!         │   (kube)   │              │   (EC2)    │
//!         └────────────┘              └────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use node_reroll_cluster::KubeCluster;
//! use node_reroll_compute::Ec2Provider;
//! use node_reroll_control::{RerollConfig, RerollContext, RerollOrchestrator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cluster = Arc::new(KubeCluster::new().await?);
//! let compute = Arc::new(Ec2Provider::new(None).await);
//! let config = RerollConfig::default().with_simulate(true);
//!
//! let orchestrator = RerollOrchestrator::new(RerollContext::new(cluster, compute, config));
//! let report = orchestrator.run().await?;
//!
//! println!("{}", report.summary_line());
//! # Ok(())
//! # }
//! ```
//!
//! # Per-node lifecycle
//!
//! - `Selected` → `Cordoned` (cordon attempted, failure only logged)
//! - `Cordoned` → `Drained` or `Failed` (drain timeout)
//! - `Drained` → `Removed` or `Failed` (node delete failed)
//! - `Removed` → `Replaced` (replacement wait finished, even on timeout)
//!
//! Failed nodes are retried once after the main pass.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod drain;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod orchestrator;
pub mod resolver;
pub mod selector;
pub mod terminator;
pub mod types;
pub mod waiter;

pub use drain::DrainCoordinator;
pub use error::{ControlError, Result};
pub use health::HealthGate;
pub use lifecycle::{NodeLifecycle, NodePhase};
pub use orchestrator::{RerollContext, RerollOrchestrator};
pub use resolver::InstanceResolver;
pub use selector::NodeSelector;
pub use terminator::InstanceTerminator;
pub use types::{RerollConfig, RerollReport, RunOutcome};
pub use waiter::ReplacementWaiter;
