//! Replacement capacity wait.

use std::time::Duration;

use node_reroll_core::SelectionCriteria;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::selector::NodeSelector;

/// Polls until the provisioner has brought ready capacity back.
#[derive(Clone)]
pub struct ReplacementWaiter {
    selector: NodeSelector,
    criteria: SelectionCriteria,
    poll_interval: Duration,
    simulate: bool,
}

impl ReplacementWaiter {
    /// Create a waiter counting ready nodes that match `criteria`.
    #[must_use]
    pub fn new(
        selector: NodeSelector,
        criteria: SelectionCriteria,
        poll_interval: Duration,
        simulate: bool,
    ) -> Self {
        Self {
            selector,
            criteria,
            poll_interval,
            simulate,
        }
    }

    /// Wait until at least `target` ready managed nodes exist, or `timeout`.
    pub async fn wait_for_replacement(&self, target: usize, timeout: Duration) -> bool {
        if self.simulate {
            info!(target, "[DRY RUN] Would wait for replacement node");
            return true;
        }

        info!(target, "Waiting for replacement node");
        let started = Instant::now();

        loop {
            match self.selector.count_ready(&self.criteria).await {
                Ok(ready) if ready >= target => {
                    info!(ready, target, "Replacement capacity ready");
                    return true;
                }
                Ok(ready) => debug!(ready, target, "Waiting for replacement"),
                Err(e) => warn!(error = %e, "Error checking for replacement nodes"),
            }

            if started.elapsed() >= timeout {
                warn!(
                    target,
                    timeout_secs = timeout.as_secs(),
                    "Timeout waiting for replacement node"
                );
                return false;
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_reroll_cluster::MockCluster;
    use node_reroll_core::labels::NODEPOOL_LABEL;
    use node_reroll_core::ClusterNode;
    use std::sync::Arc;

    fn managed(name: &str) -> ClusterNode {
        ClusterNode::new(name).with_label(NODEPOOL_LABEL, "default")
    }

    fn waiter(cluster: Arc<MockCluster>) -> ReplacementWaiter {
        ReplacementWaiter::new(
            NodeSelector::new(cluster),
            SelectionCriteria::new(),
            Duration::from_secs(10),
            false,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn returns_once_target_reached() {
        let cluster = Arc::new(
            MockCluster::new()
                .with_node(managed("node-1").ready())
                .with_node(managed("node-2").ready()),
        );

        assert!(waiter(cluster.clone()).wait_for_replacement(2, Duration::from_secs(300)).await);
        assert_eq!(cluster.node_list_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_target_is_immediate() {
        let cluster = Arc::new(MockCluster::new());

        assert!(waiter(cluster).wait_for_replacement(0, Duration::from_secs(300)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_without_capacity() {
        let cluster = Arc::new(
            MockCluster::new()
                .with_node(managed("node-1").ready())
                .with_node(managed("node-2")),
        );
        let started = Instant::now();

        assert!(!waiter(cluster.clone()).wait_for_replacement(2, Duration::from_secs(60)).await);
        assert!(started.elapsed() >= Duration::from_secs(60));
        // 0s, 10s, ..., 60s
        assert_eq!(cluster.node_list_calls(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_polling_through_query_errors() {
        let cluster = Arc::new(
            MockCluster::new()
                .with_node(managed("node-1").ready())
                .failing_node_list_after(0),
        );

        assert!(!waiter(cluster.clone()).wait_for_replacement(1, Duration::from_secs(30)).await);
        assert_eq!(cluster.node_list_calls(), 4);
    }
}
