//! Per-node reroll lifecycle.
//!
//! Each selected node moves through a fixed sequence of phases. A failed drain
//! or a failed control-plane delete ends the attempt in `Failed`; the node is
//! then queued for the retry pass with a fresh lifecycle.
//!
//! # State Machine
//!
//! ```text
//!     ┌──────────┐
//!     │ Selected │
//!     └────┬─────┘
//!          │ (cordon attempted)
//!          ▼
//!     ┌──────────┐
//!     │ Cordoned │───────────┐
//!     └────┬─────┘           │ (drain timeout)
//!          │ (pods gone)     │
//!          ▼                 ▼
//!     ┌──────────┐      ┌────────┐
//!     │ Drained  │─────▶│ Failed │
//!     └────┬─────┘      └────────┘
//!          │ (node deleted)  (delete failed)
//!          ▼
//!     ┌──────────┐
//!     │ Removed  │
//!     └────┬─────┘
//!          │ (capacity back, or wait timed out)
//!          ▼
//!     ┌──────────┐
//!     │ Replaced │
//!     └──────────┘
//! ```

use std::fmt;

use crate::error::{ControlError, Result};

/// Phase of a single node's reroll attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodePhase {
    /// Picked by the selector, nothing done yet.
    Selected,
    /// Cordon attempted.
    Cordoned,
    /// All blocking pods are gone.
    Drained,
    /// Node object deleted from the control plane.
    Removed,
    /// Replacement wait finished.
    Replaced,
    /// Drain or removal failed.
    Failed,
}

impl fmt::Display for NodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Selected => "selected",
            Self::Cordoned => "cordoned",
            Self::Drained => "drained",
            Self::Removed => "removed",
            Self::Replaced => "replaced",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Validates a phase transition and returns the target phase if valid.
///
/// # Errors
///
/// Returns `ControlError::InvalidTransition` if the transition is not allowed.
pub fn validate_transition(node: &str, from: NodePhase, to: NodePhase) -> Result<NodePhase> {
    if is_valid_transition(from, to) {
        Ok(to)
    } else {
        Err(ControlError::InvalidTransition {
            node: node.to_string(),
            from,
            to,
        })
    }
}

/// Check if a phase transition is valid according to the state machine.
#[must_use]
pub const fn is_valid_transition(from: NodePhase, to: NodePhase) -> bool {
    use NodePhase::{Cordoned, Drained, Failed, Removed, Replaced, Selected};

    matches!(
        (from, to),
        (Selected, Cordoned)
            | (Cordoned, Drained)
            | (Drained, Removed)
            | (Removed, Replaced)
            // drain failure or delete failure
            | (Cordoned | Drained, Failed)
    )
}

/// Returns the list of valid target phases from the given phase.
#[must_use]
pub fn valid_transitions_from(phase: NodePhase) -> Vec<NodePhase> {
    use NodePhase::{Cordoned, Drained, Failed, Removed, Replaced, Selected};

    match phase {
        Selected => vec![Cordoned],
        Cordoned => vec![Drained, Failed],
        Drained => vec![Removed, Failed],
        Removed => vec![Replaced],
        Replaced | Failed => vec![],
    }
}

/// Returns true if no further transitions are possible.
#[must_use]
pub const fn is_terminal(phase: NodePhase) -> bool {
    matches!(phase, NodePhase::Replaced | NodePhase::Failed)
}

/// Tracks one node through a single reroll attempt.
#[derive(Debug, Clone)]
pub struct NodeLifecycle {
    node: String,
    phase: NodePhase,
}

impl NodeLifecycle {
    /// Start tracking a freshly selected node.
    #[must_use]
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            phase: NodePhase::Selected,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> NodePhase {
        self.phase
    }

    /// Move to `to`, rejecting transitions the state machine does not allow.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidTransition` and leaves the phase unchanged.
    pub fn advance(&mut self, to: NodePhase) -> Result<NodePhase> {
        self.phase = validate_transition(&self.node, self.phase, to).inspect_err(|_| {
            tracing::error!(
                node = %self.node,
                from = %self.phase,
                to = %to,
                allowed = ?valid_transitions_from(self.phase),
                "Rejected node phase change"
            );
        })?;

        if is_terminal(self.phase) {
            tracing::debug!(node = %self.node, phase = %self.phase, "Node attempt finished");
        } else {
            tracing::debug!(node = %self.node, phase = %self.phase, "Node phase changed");
        }
        Ok(self.phase)
    }
}
