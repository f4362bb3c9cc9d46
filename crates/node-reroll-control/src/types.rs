//! Configuration and report types for the reroll.

use std::fmt;
use std::time::Duration;

use node_reroll_core::SelectionCriteria;

use crate::error::{ControlError, Result};

/// Configuration for a reroll run.
#[derive(Debug, Clone)]
pub struct RerollConfig {
    /// Log intended actions without mutating anything.
    pub simulate: bool,
    /// Requested node concurrency. Only 1 is honored.
    pub max_concurrent: u32,
    /// How long to wait for a node's pods to leave (seconds).
    pub drain_timeout_seconds: u64,
    /// Pause after each rerolled node (seconds).
    pub pause_between_nodes_seconds: u64,
    /// How long to wait for replacement capacity (seconds).
    pub replacement_timeout_seconds: u64,
    /// Interval between pod re-lists while draining (seconds).
    pub drain_poll_interval_seconds: u64,
    /// Interval between node re-lists while waiting for a replacement (seconds).
    pub replacement_poll_interval_seconds: u64,
    /// Minimum ready nodes in the cluster before any reroll starts.
    pub min_ready_nodes: usize,
    /// Delete node objects but leave their instances alone.
    pub skip_instance_termination: bool,
    /// Label filter applied on top of the provisioner-managed check.
    pub criteria: SelectionCriteria,
}

impl Default for RerollConfig {
    fn default() -> Self {
        Self {
            simulate: false,
            max_concurrent: 1,
            drain_timeout_seconds: 300,
            pause_between_nodes_seconds: 30,
            replacement_timeout_seconds: 300,
            drain_poll_interval_seconds: 5,
            replacement_poll_interval_seconds: 10,
            min_ready_nodes: 2,
            skip_instance_termination: false,
            criteria: SelectionCriteria::new(),
        }
    }
}

impl RerollConfig {
    /// Enable or disable simulate mode.
    #[must_use]
    pub fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Set the requested concurrency.
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: u32) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Set the drain timeout in seconds.
    #[must_use]
    pub fn with_drain_timeout(mut self, seconds: u64) -> Self {
        self.drain_timeout_seconds = seconds;
        self
    }

    /// Set the pause between nodes in seconds.
    #[must_use]
    pub fn with_pause_between_nodes(mut self, seconds: u64) -> Self {
        self.pause_between_nodes_seconds = seconds;
        self
    }

    /// Set the replacement timeout in seconds.
    #[must_use]
    pub fn with_replacement_timeout(mut self, seconds: u64) -> Self {
        self.replacement_timeout_seconds = seconds;
        self
    }

    /// Skip terminating instances after node deletion.
    #[must_use]
    pub fn with_skip_instance_termination(mut self, skip: bool) -> Self {
        self.skip_instance_termination = skip;
        self
    }

    /// Set the node selection criteria.
    #[must_use]
    pub fn with_criteria(mut self, criteria: SelectionCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Check that the configuration can drive a run.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidConfig` if `max_concurrent` is zero or a
    /// poll interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(ControlError::InvalidConfig(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.drain_poll_interval_seconds == 0 || self.replacement_poll_interval_seconds == 0 {
            return Err(ControlError::InvalidConfig(
                "poll intervals must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Drain timeout.
    #[must_use]
    pub const fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_seconds)
    }

    /// Pause between nodes.
    #[must_use]
    pub const fn pause_between_nodes(&self) -> Duration {
        Duration::from_secs(self.pause_between_nodes_seconds)
    }

    /// Replacement timeout.
    #[must_use]
    pub const fn replacement_timeout(&self) -> Duration {
        Duration::from_secs(self.replacement_timeout_seconds)
    }

    /// Drain poll interval.
    #[must_use]
    pub const fn drain_poll_interval(&self) -> Duration {
        Duration::from_secs(self.drain_poll_interval_seconds)
    }

    /// Replacement poll interval.
    #[must_use]
    pub const fn replacement_poll_interval(&self) -> Duration {
        Duration::from_secs(self.replacement_poll_interval_seconds)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The health gate refused to proceed.
    Unhealthy,
    /// No node matched the criteria.
    NoNodes,
    /// Simulate mode listed the candidates and stopped.
    Simulated,
    /// Every candidate went through the main pass and, if needed, the retry pass.
    Completed,
}

/// Result of a reroll run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerollReport {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Number of selected nodes.
    pub total: usize,
    /// Nodes that ended in `Replaced`.
    pub successful: usize,
    /// Names of nodes still failed after the retry pass.
    pub failed: Vec<String>,
}

impl RerollReport {
    /// Report for a run stopped by the health gate.
    #[must_use]
    pub const fn unhealthy() -> Self {
        Self::empty(RunOutcome::Unhealthy)
    }

    /// Report for a run with nothing to do.
    #[must_use]
    pub const fn no_nodes() -> Self {
        Self::empty(RunOutcome::NoNodes)
    }

    /// Report for a simulate run over `total` candidates.
    #[must_use]
    pub const fn simulated(total: usize) -> Self {
        Self {
            outcome: RunOutcome::Simulated,
            total,
            successful: 0,
            failed: Vec::new(),
        }
    }

    /// Report for a completed run.
    #[must_use]
    pub fn completed(total: usize, failed: Vec<String>) -> Self {
        Self {
            outcome: RunOutcome::Completed,
            total,
            successful: total.saturating_sub(failed.len()),
            failed,
        }
    }

    const fn empty(outcome: RunOutcome) -> Self {
        Self {
            outcome,
            total: 0,
            successful: 0,
            failed: Vec::new(),
        }
    }

    /// Process exit status for this report.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::Unhealthy => 1,
            RunOutcome::NoNodes | RunOutcome::Simulated => 0,
            RunOutcome::Completed => i32::from(!self.failed.is_empty()),
        }
    }

    /// One-line summary, e.g. `Total:2 Successful:2 Failed:0`.
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "Total:{} Successful:{} Failed:{}",
            self.total,
            self.successful,
            self.failed.len()
        )
    }
}

impl fmt::Display for RerollReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary_line())?;
        if !self.failed.is_empty() {
            write!(f, "\nFailed nodes: {}", self.failed.join(", "))?;
        }
        Ok(())
    }
}
