//! Reroll orchestration.
//!
//! Runs the health gate and the selector once, then takes every selected node
//! through its lifecycle one at a time. Nodes whose drain or removal failed are
//! retried once, in order, after the main pass.

use std::sync::Arc;

use node_reroll_cluster::ClusterApi;
use node_reroll_compute::ComputeProvider;
use node_reroll_core::ClusterNode;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::drain::DrainCoordinator;
use crate::error::Result;
use crate::health::HealthGate;
use crate::lifecycle::{NodeLifecycle, NodePhase};
use crate::resolver::InstanceResolver;
use crate::selector::NodeSelector;
use crate::terminator::InstanceTerminator;
use crate::types::{RerollConfig, RerollReport};
use crate::waiter::ReplacementWaiter;

const BANNER: &str = "============================================================";

/// Clients and configuration for a run.
#[derive(Clone)]
pub struct RerollContext {
    /// Cluster control plane.
    pub cluster: Arc<dyn ClusterApi>,
    /// Compute provider hosting the nodes.
    pub compute: Arc<dyn ComputeProvider>,
    /// Run configuration.
    pub config: RerollConfig,
}

impl RerollContext {
    /// Bundle clients and configuration.
    #[must_use]
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        compute: Arc<dyn ComputeProvider>,
        config: RerollConfig,
    ) -> Self {
        Self {
            cluster,
            compute,
            config,
        }
    }
}

/// State of one run, alive for the duration of `run`.
struct RerollSession {
    original_ready: usize,
    attempts: usize,
    failed: Vec<ClusterNode>,
}

impl RerollSession {
    fn new(nodes: &[ClusterNode]) -> Self {
        let original_ready = nodes.iter().filter(|node| node.is_ready()).count();
        Self {
            original_ready,
            attempts: 0,
            failed: Vec::new(),
        }
    }

    /// Ready-node target for the next attempt. Each attempt expects one fewer
    /// node, since the node it removes may still be counted as ready.
    fn next_target(&mut self) -> usize {
        let target = self.original_ready.saturating_sub(self.attempts);
        self.attempts += 1;
        target
    }
}

/// Drives selected nodes through cordon, drain, removal and replacement.
pub struct RerollOrchestrator {
    config: RerollConfig,
    cluster: Arc<dyn ClusterApi>,
    selector: NodeSelector,
    health: HealthGate,
    drain: DrainCoordinator,
    resolver: InstanceResolver,
    terminator: InstanceTerminator,
    waiter: ReplacementWaiter,
}

impl RerollOrchestrator {
    /// Build the orchestrator and its components from a context.
    #[must_use]
    pub fn new(context: RerollContext) -> Self {
        let RerollContext {
            cluster,
            compute,
            config,
        } = context;

        let selector = NodeSelector::new(cluster.clone());
        let health = HealthGate::new(cluster.clone(), config.min_ready_nodes);
        let drain = DrainCoordinator::new(
            cluster.clone(),
            config.simulate,
            config.drain_poll_interval(),
        );
        let resolver = InstanceResolver::new(compute.clone());
        let terminator = InstanceTerminator::new(compute, config.simulate);
        let waiter = ReplacementWaiter::new(
            selector.clone(),
            config.criteria.clone(),
            config.replacement_poll_interval(),
            config.simulate,
        );

        Self {
            config,
            cluster,
            selector,
            health,
            drain,
            resolver,
            terminator,
            waiter,
        }
    }

    /// Run the whole reroll.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidConfig` for an unusable configuration and
    /// `ControlError::ClusterQuery` if node selection fails.
    pub async fn run(&self) -> Result<RerollReport> {
        self.config.validate()?;

        info!("Starting node re-roll process");
        if self.config.simulate {
            info!("DRY RUN MODE - No changes will be made");
        }
        if self.config.max_concurrent > 1 {
            warn!(
                max_concurrent = self.config.max_concurrent,
                "Concurrent re-roll is not supported, processing one node at a time"
            );
        }

        if !self.health.check_health().await {
            error!("Cluster health check failed, aborting");
            return Ok(RerollReport::unhealthy());
        }

        let nodes = self.selector.select(&self.config.criteria).await?;
        if nodes.is_empty() {
            warn!("No provisioner-managed nodes found matching criteria");
            return Ok(RerollReport::no_nodes());
        }

        info!("Found {} node(s) to re-roll:", nodes.len());
        for node in &nodes {
            let instance_id = InstanceResolver::resolve_local(node);
            info!(
                node = %node.name,
                nodepool = node.node_pool().unwrap_or("unknown"),
                instance_type = node.instance_type().unwrap_or("unknown"),
                instance_id = instance_id.as_deref().unwrap_or("unknown"),
                "  - {}",
                node.name
            );
        }

        if self.config.simulate {
            for node in &nodes {
                info!(node = %node.name, "[DRY RUN] Would re-roll node");
            }
            return Ok(RerollReport::simulated(nodes.len()));
        }

        let mut session = RerollSession::new(&nodes);
        let total = nodes.len();

        for (index, node) in nodes.iter().enumerate() {
            info!("Processing node {}/{}: {}", index + 1, total, node.name);
            let target = session.next_target();
            if !self.attempt(node, target, true).await {
                error!(node = %node.name, "Failed to re-roll node, queued for retry");
                session.failed.push(node.clone());
            }
        }

        let retry = std::mem::take(&mut session.failed);
        let mut still_failed = Vec::new();
        if !retry.is_empty() {
            info!("Retrying {} failed node(s)", retry.len());
            for (index, node) in retry.iter().enumerate() {
                let last = index + 1 == retry.len();
                info!("Retry {}/{}: {}", index + 1, retry.len(), node.name);
                let target = session.next_target();
                if !self.attempt(node, target, !last).await {
                    error!(node = %node.name, "Retry failed");
                    still_failed.push(node.name.clone());
                }
            }
        }

        let report = RerollReport::completed(total, still_failed);
        info!("{BANNER}");
        info!("Re-roll complete!");
        info!(
            total = report.total,
            successful = report.successful,
            failed = report.failed.len(),
            "{}",
            report.summary_line()
        );
        if !report.failed.is_empty() {
            error!("Failed nodes: {}", report.failed.join(", "));
        }
        info!("{BANNER}");

        Ok(report)
    }

    async fn attempt(&self, node: &ClusterNode, target: usize, pause_after: bool) -> bool {
        match self.reroll_node(node, target, pause_after).await {
            Ok(phase) => phase == NodePhase::Replaced,
            Err(e) => {
                error!(node = %node.name, error = %e, "Node lifecycle error");
                false
            }
        }
    }

    /// Take one node through its lifecycle.
    ///
    /// Returns the final phase: `Replaced` on success, `Failed` if the drain or
    /// the node deletion failed.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidTransition` if the lifecycle is driven out
    /// of order.
    pub async fn reroll_node(
        &self,
        node: &ClusterNode,
        target: usize,
        pause_after: bool,
    ) -> Result<NodePhase> {
        info!(node = %node.name, "Starting re-roll of node");
        let mut lifecycle = NodeLifecycle::new(node.name.as_str());

        if !self.drain.cordon(&node.name).await {
            warn!(node = %node.name, "Cordon failed, continuing with drain");
        }
        lifecycle.advance(NodePhase::Cordoned)?;

        if !self
            .drain
            .drain(&node.name, self.config.drain_timeout())
            .await
        {
            error!(node = %node.name, "Failed to drain node");
            return lifecycle.advance(NodePhase::Failed);
        }
        lifecycle.advance(NodePhase::Drained)?;

        if !self.remove_node(node).await {
            return lifecycle.advance(NodePhase::Failed);
        }
        lifecycle.advance(NodePhase::Removed)?;

        if !self
            .waiter
            .wait_for_replacement(target, self.config.replacement_timeout())
            .await
        {
            warn!(node = %node.name, "Replacement node not ready in time, proceeding anyway");
        }
        let phase = lifecycle.advance(NodePhase::Replaced)?;
        info!(node = %node.name, "Successfully re-rolled node");

        let pause = self.config.pause_between_nodes();
        if pause_after && !pause.is_zero() {
            info!("Waiting {}s before next node...", pause.as_secs());
            sleep(pause).await;
        }

        Ok(phase)
    }

    /// Delete the node object, then terminate its instance.
    ///
    /// Only the delete decides the result. Instance termination is best
    /// effort once the node object is gone.
    async fn remove_node(&self, node: &ClusterNode) -> bool {
        if self.config.simulate {
            info!(node = %node.name, "[DRY RUN] Would delete node");
            return true;
        }

        match self.cluster.delete_node(&node.name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => info!(node = %node.name, "Node already removed"),
            Err(e) => {
                error!(node = %node.name, error = %e, "Error deleting node");
                return false;
            }
        }

        if self.config.skip_instance_termination {
            info!(node = %node.name, "Skipping instance termination");
            return true;
        }

        if let Some(instance_id) = self.resolver.resolve(node).await {
            if !self.terminator.terminate(&instance_id).await {
                warn!(
                    node = %node.name,
                    instance_id = %instance_id,
                    "Instance not terminated, node object already removed"
                );
            }
        }
        true
    }
}
