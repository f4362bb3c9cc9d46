//! Cordon and drain.
//!
//! Pods are removed through the Eviction API so disruption budgets are
//! honored. A budget rejection is not retried inside a drain; the pod simply
//! stays put and the drain times out if it never leaves. Daemon-owned and
//! mirror pods never block a drain, and neither do pods that were already
//! terminating when the drain began.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use node_reroll_cluster::ClusterApi;
use node_reroll_core::WorkloadPod;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

/// Cordons nodes and evicts their workload pods.
#[derive(Clone)]
pub struct DrainCoordinator {
    cluster: Arc<dyn ClusterApi>,
    simulate: bool,
    poll_interval: Duration,
}

impl DrainCoordinator {
    /// Create a coordinator polling pod state every `poll_interval`.
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterApi>, simulate: bool, poll_interval: Duration) -> Self {
        Self {
            cluster,
            simulate,
            poll_interval,
        }
    }

    /// Mark the node unschedulable.
    pub async fn cordon(&self, node_name: &str) -> bool {
        if self.simulate {
            info!(node = node_name, "[DRY RUN] Would cordon node");
            return true;
        }

        match self.cluster.cordon_node(node_name).await {
            Ok(()) => true,
            Err(e) => {
                error!(node = node_name, error = %e, "Error cordoning node");
                false
            }
        }
    }

    /// Evict the node's workload pods and wait up to `timeout` for them to go.
    pub async fn drain(&self, node_name: &str, timeout: Duration) -> bool {
        if self.simulate {
            info!(node = node_name, "[DRY RUN] Would drain node");
            return true;
        }

        let pods = match self.cluster.list_pods_on_node(node_name).await {
            Ok(pods) => pods,
            Err(e) => {
                error!(node = node_name, error = %e, "Error listing pods on node");
                return false;
            }
        };

        let already_terminating: HashSet<String> = pods
            .iter()
            .filter(|pod| pod.is_terminating())
            .map(WorkloadPod::key)
            .collect();

        let evictable: Vec<&WorkloadPod> = pods.iter().filter(|pod| pod.is_evictable()).collect();
        if evictable.is_empty() {
            info!(node = node_name, "No pods to evict");
            return true;
        }

        info!(node = node_name, count = evictable.len(), "Evicting pods from node");
        for pod in evictable {
            self.evict(pod).await;
        }

        self.wait_for_evacuation(node_name, &already_terminating, timeout)
            .await
    }

    async fn evict(&self, pod: &WorkloadPod) {
        match self.cluster.evict_pod(pod).await {
            Ok(()) => debug!(pod = %pod.key(), "Evicted pod"),
            Err(e) if e.is_disruption_budget() => {
                warn!(pod = %pod.key(), "Cannot evict pod due to PodDisruptionBudget");
            }
            Err(e) if e.is_not_found() => debug!(pod = %pod.key(), "Pod already gone"),
            Err(e) => error!(pod = %pod.key(), error = %e, "Error evicting pod"),
        }
    }

    async fn wait_for_evacuation(
        &self,
        node_name: &str,
        already_terminating: &HashSet<String>,
        timeout: Duration,
    ) -> bool {
        let started = Instant::now();

        loop {
            match self.cluster.list_pods_on_node(node_name).await {
                Ok(pods) => {
                    let remaining = pods
                        .iter()
                        .filter(|pod| blocks_drain(pod, already_terminating))
                        .count();
                    if remaining == 0 {
                        info!(node = node_name, "Successfully drained node");
                        return true;
                    }
                    debug!(node = node_name, remaining, "Waiting for pods to terminate");
                }
                Err(e) => warn!(node = node_name, error = %e, "Error checking pod status"),
            }

            if started.elapsed() >= timeout {
                warn!(
                    node = node_name,
                    timeout_secs = timeout.as_secs(),
                    "Drain timeout reached"
                );
                return false;
            }
            sleep(self.poll_interval).await;
        }
    }
}

fn blocks_drain(pod: &WorkloadPod, already_terminating: &HashSet<String>) -> bool {
    !pod.is_daemon_workload() && !pod.is_mirror() && !already_terminating.contains(&pod.key())
}
