//! Reroll candidate selection.

use std::sync::Arc;

use node_reroll_cluster::ClusterApi;
use node_reroll_core::{ClusterNode, SelectionCriteria};
use tracing::{debug, error};

use crate::error::Result;

/// Finds provisioner-managed nodes matching a label filter.
#[derive(Clone)]
pub struct NodeSelector {
    cluster: Arc<dyn ClusterApi>,
}

impl NodeSelector {
    /// Create a selector over the given cluster.
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self { cluster }
    }

    /// List managed nodes matching `criteria`, in listing order.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::ClusterQuery` if the node list fails.
    pub async fn select(&self, criteria: &SelectionCriteria) -> Result<Vec<ClusterNode>> {
        let nodes = self.cluster.list_nodes().await.map_err(|e| {
            error!(error = %e, "Error listing nodes");
            e
        })?;
        let listed = nodes.len();

        let selected: Vec<ClusterNode> = nodes
            .into_iter()
            .filter(|node| criteria.selects(node))
            .collect();

        debug!(listed, selected = selected.len(), "Selected managed nodes");
        Ok(selected)
    }

    /// Count ready nodes among those matching `criteria`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::ClusterQuery` if the node list fails.
    pub async fn count_ready(&self, criteria: &SelectionCriteria) -> Result<usize> {
        let nodes = self.select(criteria).await?;
        Ok(nodes.iter().filter(|node| node.is_ready()).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ControlError;
    use node_reroll_cluster::MockCluster;
    use node_reroll_core::labels::{NODEPOOL_LABEL, PROVISIONER_NAME_LABEL};

    fn cluster() -> Arc<MockCluster> {
        Arc::new(
            MockCluster::new()
                .with_node(ClusterNode::new("system-1").ready())
                .with_node(
                    ClusterNode::new("pool-a-1")
                        .with_label(NODEPOOL_LABEL, "pool-a")
                        .with_label("team", "platform")
                        .ready(),
                )
                .with_node(
                    ClusterNode::new("legacy-1")
                        .with_label(PROVISIONER_NAME_LABEL, "default")
                        .with_label("team", "data"),
                )
                .with_node(ClusterNode::new("blank-1").with_label(NODEPOOL_LABEL, "  ").ready())
                .with_node(
                    ClusterNode::new("pool-b-1")
                        .with_label(NODEPOOL_LABEL, "pool-b")
                        .with_label("team", "platform")
                        .ready(),
                ),
        )
    }

    fn names(nodes: &[ClusterNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[tokio::test]
    async fn selects_only_managed_nodes() {
        let selector = NodeSelector::new(cluster());

        let nodes = selector.select(&SelectionCriteria::new()).await.unwrap();

        assert_eq!(names(&nodes), vec!["pool-a-1", "legacy-1", "pool-b-1"]);
    }

    #[tokio::test]
    async fn applies_label_criteria() {
        let selector = NodeSelector::new(cluster());
        let criteria = SelectionCriteria::new().with_label("team", "platform");

        let nodes = selector.select(&criteria).await.unwrap();

        assert_eq!(names(&nodes), vec!["pool-a-1", "pool-b-1"]);
        assert!(nodes.iter().all(|n| n.label("team") == Some("platform")));
    }

    #[tokio::test]
    async fn node_pool_criteria() {
        let selector = NodeSelector::new(cluster());
        let criteria = SelectionCriteria::new().with_node_pool("pool-b");

        let nodes = selector.select(&criteria).await.unwrap();

        assert_eq!(names(&nodes), vec!["pool-b-1"]);
    }

    #[tokio::test]
    async fn counts_ready_managed_nodes() {
        let selector = NodeSelector::new(cluster());

        // legacy-1 is not ready, system-1 and blank-1 are not managed
        assert_eq!(selector.count_ready(&SelectionCriteria::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn list_failure_is_an_error() {
        let selector = NodeSelector::new(Arc::new(MockCluster::new().failing_node_list_after(0)));

        let result = selector.select(&SelectionCriteria::new()).await;

        assert!(matches!(result, Err(ControlError::ClusterQuery(_))));
    }
}
