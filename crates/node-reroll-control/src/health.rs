//! Cluster health gate.

use std::sync::Arc;

use node_reroll_cluster::ClusterApi;
use tracing::{error, info};

/// Refuses to start a reroll unless enough nodes are ready.
#[derive(Clone)]
pub struct HealthGate {
    cluster: Arc<dyn ClusterApi>,
    min_ready_nodes: usize,
}

impl HealthGate {
    /// Create a gate requiring at least `min_ready_nodes` ready nodes.
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterApi>, min_ready_nodes: usize) -> Self {
        Self {
            cluster,
            min_ready_nodes,
        }
    }

    /// Count ready nodes across the whole cluster.
    ///
    /// Fails closed: a query error reports the cluster as unhealthy.
    pub async fn check_health(&self) -> bool {
        let nodes = match self.cluster.list_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => {
                error!(error = %e, "Error checking cluster health");
                return false;
            }
        };

        let ready = nodes.iter().filter(|node| node.is_ready()).count();
        if ready < self.min_ready_nodes {
            error!(
                ready,
                required = self.min_ready_nodes,
                "Only {} ready nodes in cluster, aborting for safety",
                ready
            );
            return false;
        }

        info!(ready, total = nodes.len(), "Cluster health check passed");
        true
    }
}
