//! Kubernetes node and pod operations for node-reroll.
//!
//! This crate provides the [`ClusterApi`] trait and [`KubeCluster`] implementation
//! covering the control-plane calls a node reroll needs:
//!
//! - Node listing and cordoning
//! - Listing pods scheduled on a node
//! - Pod eviction through the Eviction API, which respects PodDisruptionBudgets
//! - Node deletion
//!
//! Kubernetes objects are converted into the plain value types from
//! `node-reroll-core` before they leave this crate.
//!
//! # Example
//!
//! ```no_run
//! use node_reroll_cluster::{ClusterApi, KubeCluster};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cluster = KubeCluster::new().await?;
//!
//! for node in cluster.list_nodes().await? {
//!     println!("{} ready={}", node.name, node.is_ready());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! For testing without a real Kubernetes cluster, enable the `test-utils` feature
//! and use the in-memory cluster:
//!
//! ```ignore
//! use node_reroll_cluster::{ClusterApi, MockCluster};
//! use node_reroll_core::ClusterNode;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cluster = MockCluster::new().with_node(ClusterNode::new("node-a").ready());
//!
//! cluster.cordon_node("node-a").await?;
//! assert_eq!(cluster.calls().len(), 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod convert;
pub mod error;
pub mod k8s;

pub use error::{ClusterError, Result};
pub use k8s::{ClusterApi, KubeCluster};

#[cfg(any(test, feature = "test-utils"))]
pub use k8s::mock::{ClusterCall, MockCluster};
