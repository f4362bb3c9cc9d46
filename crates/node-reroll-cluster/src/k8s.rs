//! Kubernetes cluster implementation.
//!
//! This module provides the [`ClusterApi`] trait consumed by the reroll
//! orchestrator and [`KubeCluster`], which implements it on top of kube-rs.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, DeleteParams, EvictParams, ListParams, Patch, PatchParams};
use kube::Client;
use node_reroll_core::{ClusterNode, WorkloadPod};
use serde_json::json;
use tracing::{debug, info};

use crate::convert::{cluster_node, workload_pod};
use crate::{ClusterError, Result};

/// Control-plane operations needed to reroll nodes.
///
/// Every mutating call reports a missing target as
/// [`ClusterError::NotFound`] so callers can treat it as already done.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// List every node in the cluster, in control-plane order.
    ///
    /// # Errors
    ///
    /// Returns an error if the list call fails.
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>>;

    /// Mark a node unschedulable.
    ///
    /// # Errors
    ///
    /// Returns an error if the patch fails.
    async fn cordon_node(&self, node_name: &str) -> Result<()>;

    /// List pods scheduled on the given node, across all namespaces.
    ///
    /// # Errors
    ///
    /// Returns an error if the list call fails.
    async fn list_pods_on_node(&self, node_name: &str) -> Result<Vec<WorkloadPod>>;

    /// Request eviction of a pod.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::DisruptionBudget` when admission refuses the
    /// eviction, `ClusterError::NotFound` when the pod is already gone.
    async fn evict_pod(&self, pod: &WorkloadPod) -> Result<()>;

    /// Delete a node object from the control plane.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    async fn delete_node(&self, node_name: &str) -> Result<()>;
}

/// kube-rs backed cluster client.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Connect using kubeconfig or in-cluster configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable configuration is found.
    pub async fn new() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client })
    }

    /// Create a cluster client around a pre-configured kube client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn nodes_api(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    fn pods_api(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>> {
        let list = self.nodes_api().list(&ListParams::default()).await?;
        debug!(count = list.items.len(), "Listed cluster nodes");
        list.items.iter().map(cluster_node).collect()
    }

    async fn cordon_node(&self, node_name: &str) -> Result<()> {
        let patch = json!({ "spec": { "unschedulable": true } });
        self.nodes_api()
            .patch(node_name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| ClusterError::from_kube(format!("node/{node_name}"), e))?;
        info!(node = node_name, "Cordoned node");
        Ok(())
    }

    async fn list_pods_on_node(&self, node_name: &str) -> Result<Vec<WorkloadPod>> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let params = ListParams::default().fields(&format!("spec.nodeName={node_name}"));
        let list = pods.list(&params).await?;
        list.items.iter().map(workload_pod).collect()
    }

    async fn evict_pod(&self, pod: &WorkloadPod) -> Result<()> {
        self.pods_api(&pod.namespace)
            .evict(&pod.name, &EvictParams::default())
            .await
            .map_err(|e| ClusterError::from_kube(pod.key(), e))?;
        debug!(pod = %pod.key(), "Created eviction");
        Ok(())
    }

    async fn delete_node(&self, node_name: &str) -> Result<()> {
        self.nodes_api()
            .delete(node_name, &DeleteParams::default())
            .await
            .map_err(|e| ClusterError::from_kube(format!("node/{node_name}"), e))?;
        info!(node = node_name, "Deleted node");
        Ok(())
    }
}

/// An in-memory cluster for testing without a real control plane.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use node_reroll_core::labels::READY_CONDITION;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// A mutating call recorded by [`MockCluster`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ClusterCall {
        /// `cordon_node(name)`
        Cordon(String),
        /// `evict_pod(namespace/name)`
        Evict(String),
        /// `delete_node(name)`
        DeleteNode(String),
    }

    struct MockPod {
        node: String,
        pod: WorkloadPod,
        pdb_rejections: u32,
        /// Listings an evicted pod stays visible for while terminating.
        grace_listings: u32,
        evicted: bool,
    }

    #[derive(Default)]
    struct State {
        nodes: Vec<ClusterNode>,
        pods: Vec<MockPod>,
        calls: Vec<ClusterCall>,
        node_list_calls: usize,
        node_list_budget: Option<usize>,
        cordon_failures: HashMap<String, u32>,
        delete_failures: HashMap<String, u32>,
        auto_replace: bool,
        replacements: usize,
    }

    /// A mock cluster that keeps nodes and pods in memory.
    ///
    /// Evicted pods disappear immediately unless they are protected by a
    /// simulated disruption budget. With auto-replace enabled, deleting a
    /// node adds a ready replacement carrying the same labels, the way the
    /// provisioner would.
    #[derive(Default)]
    pub struct MockCluster {
        state: Mutex<State>,
    }

    impl MockCluster {
        /// Create an empty mock cluster.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a node.
        #[must_use]
        pub fn with_node(self, node: ClusterNode) -> Self {
            self.state.lock().nodes.push(node);
            self
        }

        /// Schedule a pod on a node.
        #[must_use]
        pub fn with_pod(self, node_name: &str, pod: WorkloadPod) -> Self {
            self.with_protected_pod(node_name, pod, 0)
        }

        /// Schedule a pod whose first `rejections` evictions are refused by a
        /// disruption budget.
        #[must_use]
        pub fn with_protected_pod(
            self,
            node_name: &str,
            pod: WorkloadPod,
            rejections: u32,
        ) -> Self {
            self.push_pod(node_name, pod, rejections, 0)
        }

        /// Schedule a pod that keeps running after eviction: it gets a
        /// deletion timestamp and stays in the next `lingers_for` pod listings.
        #[must_use]
        pub fn with_graceful_pod(
            self,
            node_name: &str,
            pod: WorkloadPod,
            lingers_for: u32,
        ) -> Self {
            self.push_pod(node_name, pod, 0, lingers_for)
        }

        fn push_pod(self, node_name: &str, pod: WorkloadPod, rejections: u32, grace: u32) -> Self {
            self.state.lock().pods.push(MockPod {
                node: node_name.to_string(),
                pod,
                pdb_rejections: rejections,
                grace_listings: grace,
                evicted: false,
            });
            self
        }

        /// Add a ready replacement node whenever a node is deleted.
        #[must_use]
        pub fn with_auto_replace(self) -> Self {
            self.state.lock().auto_replace = true;
            self
        }

        /// Make the next `times` cordon calls for `node_name` fail.
        #[must_use]
        pub fn failing_cordon(self, node_name: &str, times: u32) -> Self {
            self.state
                .lock()
                .cordon_failures
                .insert(node_name.to_string(), times);
            self
        }

        /// Make the next `times` delete calls for `node_name` fail.
        #[must_use]
        pub fn failing_delete(self, node_name: &str, times: u32) -> Self {
            self.state
                .lock()
                .delete_failures
                .insert(node_name.to_string(), times);
            self
        }

        /// Let the first `successful_calls` node list calls succeed and fail
        /// every call after that.
        #[must_use]
        pub fn failing_node_list_after(self, successful_calls: usize) -> Self {
            self.state.lock().node_list_budget = Some(successful_calls);
            self
        }

        /// Remove a pod, as if its controller finished deleting it.
        pub fn remove_pod(&self, namespace: &str, name: &str) {
            self.state
                .lock()
                .pods
                .retain(|p| !(p.pod.namespace == namespace && p.pod.name == name));
        }

        /// Every mutating call, in order.
        #[must_use]
        pub fn calls(&self) -> Vec<ClusterCall> {
            self.state.lock().calls.clone()
        }

        /// Number of `list_nodes` calls made so far.
        #[must_use]
        pub fn node_list_calls(&self) -> usize {
            self.state.lock().node_list_calls
        }

        /// Names of the nodes currently in the cluster.
        #[must_use]
        pub fn node_names(&self) -> Vec<String> {
            self.state.lock().nodes.iter().map(|n| n.name.clone()).collect()
        }

        /// Keys of the evictions requested so far.
        #[must_use]
        pub fn evictions(&self) -> Vec<String> {
            self.state
                .lock()
                .calls
                .iter()
                .filter_map(|c| match c {
                    ClusterCall::Evict(key) => Some(key.clone()),
                    _ => None,
                })
                .collect()
        }

        fn consume_failure(failures: &mut HashMap<String, u32>, name: &str) -> bool {
            match failures.get_mut(name) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        }
    }

    #[async_trait]
    impl ClusterApi for MockCluster {
        async fn list_nodes(&self) -> Result<Vec<ClusterNode>> {
            let mut state = self.state.lock();
            state.node_list_calls += 1;
            if state
                .node_list_budget
                .is_some_and(|budget| state.node_list_calls > budget)
            {
                return Err(ClusterError::Unavailable("node list failed".to_string()));
            }
            Ok(state.nodes.clone())
        }

        async fn cordon_node(&self, node_name: &str) -> Result<()> {
            let mut state = self.state.lock();
            state.calls.push(ClusterCall::Cordon(node_name.to_string()));
            if Self::consume_failure(&mut state.cordon_failures, node_name) {
                return Err(ClusterError::Unavailable(format!("cordon {node_name}")));
            }
            let node = state
                .nodes
                .iter_mut()
                .find(|n| n.name == node_name)
                .ok_or_else(|| ClusterError::NotFound(format!("node/{node_name}")))?;
            node.unschedulable = true;
            Ok(())
        }

        async fn list_pods_on_node(&self, node_name: &str) -> Result<Vec<WorkloadPod>> {
            let mut state = self.state.lock();
            state
                .pods
                .retain(|p| !(p.node == node_name && p.evicted && p.grace_listings == 0));

            let mut listed = Vec::new();
            for p in state.pods.iter_mut().filter(|p| p.node == node_name) {
                if p.evicted {
                    p.grace_listings -= 1;
                }
                listed.push(p.pod.clone());
            }
            Ok(listed)
        }

        async fn evict_pod(&self, pod: &WorkloadPod) -> Result<()> {
            let mut state = self.state.lock();
            state.calls.push(ClusterCall::Evict(pod.key()));
            let index = state
                .pods
                .iter()
                .position(|p| p.pod.namespace == pod.namespace && p.pod.name == pod.name)
                .ok_or_else(|| ClusterError::NotFound(pod.key()))?;
            let target = &mut state.pods[index];
            if target.pdb_rejections > 0 {
                target.pdb_rejections -= 1;
                return Err(ClusterError::DisruptionBudget(pod.key()));
            }
            if target.grace_listings > 0 {
                if !target.evicted {
                    target.evicted = true;
                    target.pod.deletion_timestamp = Some(chrono::Utc::now());
                }
                return Ok(());
            }
            state.pods.remove(index);
            Ok(())
        }

        async fn delete_node(&self, node_name: &str) -> Result<()> {
            let mut state = self.state.lock();
            state.calls.push(ClusterCall::DeleteNode(node_name.to_string()));
            if Self::consume_failure(&mut state.delete_failures, node_name) {
                return Err(ClusterError::Unavailable(format!("delete {node_name}")));
            }
            let index = state
                .nodes
                .iter()
                .position(|n| n.name == node_name)
                .ok_or_else(|| ClusterError::NotFound(format!("node/{node_name}")))?;
            let removed = state.nodes.remove(index);
            state.pods.retain(|p| p.node != node_name);

            if state.auto_replace {
                state.replacements += 1;
                let mut replacement =
                    ClusterNode::new(format!("replacement-{}", state.replacements));
                replacement.labels = removed.labels;
                state.nodes.push(replacement.with_condition(READY_CONDITION, "True"));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{ClusterCall, MockCluster};
    use super::*;
    use node_reroll_core::labels::NODEPOOL_LABEL;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn managed(name: &str) -> ClusterNode {
        ClusterNode::new(name).with_label(NODEPOOL_LABEL, "default").ready()
    }

    fn kube_client(server: &MockServer) -> Client {
        let config = kube::Config::new(server.uri().parse().unwrap());
        Client::try_from(config).unwrap()
    }

    fn status_body(code: u16, reason: &str) -> serde_json::Value {
        json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": format!("{reason} (test)"),
            "reason": reason,
            "code": code
        })
    }

    #[tokio::test]
    async fn mock_cluster_evicts_and_records_calls() {
        let cluster = MockCluster::new()
            .with_node(managed("node-a"))
            .with_pod("node-a", WorkloadPod::new("default", "web-1"));

        cluster.cordon_node("node-a").await.unwrap();
        cluster
            .evict_pod(&WorkloadPod::new("default", "web-1"))
            .await
            .unwrap();

        assert!(cluster.list_pods_on_node("node-a").await.unwrap().is_empty());
        assert_eq!(
            cluster.calls(),
            vec![
                ClusterCall::Cordon("node-a".to_string()),
                ClusterCall::Evict("default/web-1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn mock_cluster_graceful_pod_lingers_after_eviction() {
        let pod = WorkloadPod::new("default", "web-1");
        let cluster = MockCluster::new()
            .with_node(managed("node-a"))
            .with_graceful_pod("node-a", pod.clone(), 2);

        cluster.evict_pod(&pod).await.unwrap();

        for _ in 0..2 {
            let listed = cluster.list_pods_on_node("node-a").await.unwrap();
            assert_eq!(listed.len(), 1);
            assert!(listed[0].is_terminating());
        }
        assert!(cluster.list_pods_on_node("node-a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mock_cluster_disruption_budget_then_success() {
        let pod = WorkloadPod::new("default", "db-0");
        let cluster = MockCluster::new()
            .with_node(managed("node-a"))
            .with_protected_pod("node-a", pod.clone(), 1);

        let err = cluster.evict_pod(&pod).await.unwrap_err();
        assert!(err.is_disruption_budget());
        assert_eq!(cluster.list_pods_on_node("node-a").await.unwrap().len(), 1);

        cluster.evict_pod(&pod).await.unwrap();
        assert!(cluster.list_pods_on_node("node-a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mock_cluster_auto_replace() {
        let cluster = MockCluster::new()
            .with_node(managed("node-a"))
            .with_auto_replace();

        cluster.delete_node("node-a").await.unwrap();

        let nodes = cluster.list_nodes().await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "replacement-1");
        assert!(nodes[0].is_ready());
        assert!(nodes[0].is_provisioner_managed());

        let err = cluster.delete_node("node-a").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn kube_cluster_lists_nodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "v1",
                "kind": "NodeList",
                "metadata": {},
                "items": [{
                    "metadata": {
                        "name": "ip-10-0-1-5",
                        "labels": { "karpenter.sh/nodepool": "default" }
                    },
                    "spec": { "providerID": "aws:///us-east-1a/i-0abc" },
                    "status": {
                        "conditions": [{ "type": "Ready", "status": "True" }],
                        "addresses": [{ "type": "InternalIP", "address": "10.0.1.5" }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let cluster = KubeCluster::with_client(kube_client(&server));
        let nodes = cluster.list_nodes().await.unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "ip-10-0-1-5");
        assert!(nodes[0].is_ready());
        assert_eq!(nodes[0].provider_id.as_deref(), Some("aws:///us-east-1a/i-0abc"));
    }

    #[tokio::test]
    async fn kube_cluster_filters_pods_by_node() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/pods"))
            .and(query_param("fieldSelector", "spec.nodeName=node-a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "v1",
                "kind": "PodList",
                "metadata": {},
                "items": [{
                    "metadata": {
                        "name": "web-1",
                        "namespace": "default",
                        "ownerReferences": [{
                            "apiVersion": "apps/v1",
                            "kind": "ReplicaSet",
                            "name": "web",
                            "uid": "1"
                        }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let cluster = KubeCluster::with_client(kube_client(&server));
        let pods = cluster.list_pods_on_node("node-a").await.unwrap();

        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].key(), "default/web-1");
        assert!(pods[0].is_evictable());
    }

    #[tokio::test]
    async fn kube_cluster_maps_eviction_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/namespaces/default/pods/web-1/eviction"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(status_body(429, "TooManyRequests")),
            )
            .mount(&server)
            .await;

        let cluster = KubeCluster::with_client(kube_client(&server));
        let err = cluster
            .evict_pod(&WorkloadPod::new("default", "web-1"))
            .await
            .unwrap_err();

        assert!(err.is_disruption_budget());
    }

    #[tokio::test]
    async fn kube_cluster_maps_missing_node() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/nodes/node-gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(status_body(404, "NotFound")))
            .mount(&server)
            .await;

        let cluster = KubeCluster::with_client(kube_client(&server));
        let err = cluster.delete_node("node-gone").await.unwrap_err();

        assert!(err.is_not_found());
    }
}
