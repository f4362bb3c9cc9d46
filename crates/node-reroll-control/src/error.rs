//! Error types for the reroll control flow.
//!
//! Only failures that end the whole run surface as [`ControlError`]. Step
//! failures inside a single node's reroll are logged and folded into the
//! node's lifecycle instead.

use node_reroll_cluster::ClusterError;
use thiserror::Error;

use crate::lifecycle::NodePhase;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors that can occur in reroll control operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Listing nodes failed while selecting reroll candidates.
    #[error("cluster query failed: {0}")]
    ClusterQuery(#[from] ClusterError),

    /// The requested lifecycle transition is not valid.
    #[error("invalid transition for node {node}: cannot transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// The node being transitioned.
        node: String,
        /// The current phase.
        from: NodePhase,
        /// The requested target phase.
        to: NodePhase,
    },

    /// The reroll configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
