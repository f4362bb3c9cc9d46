//! Core types for node-reroll.
//!
//! This crate provides the value types shared by every other node-reroll crate:
//!
//! - **Nodes**: [`ClusterNode`], a read-only snapshot of a cluster worker node
//! - **Pods**: [`WorkloadPod`], a read-only snapshot of a pod scheduled on a node
//! - **Selection**: [`SelectionCriteria`], the exact-match label filter applied on
//!   top of the provisioner-managed marker
//! - **Error types**: [`CoreError`] for malformed user input
//!
//! # Example
//!
//! ```
//! use node_reroll_core::{parse_label_filter, SelectionCriteria};
//!
//! let (key, value) = parse_label_filter("team=platform").unwrap();
//! let criteria = SelectionCriteria::new().with_label(key, value);
//!
//! assert_eq!(criteria.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod labels;
pub mod node;
pub mod pod;
pub mod selector;

pub use error::{CoreError, Result};
pub use node::{ClusterNode, NodeAddress, NodeCondition};
pub use pod::{OwnerRef, WorkloadPod};
pub use selector::{parse_label_filter, SelectionCriteria};
