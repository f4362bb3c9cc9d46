//! End-to-end reroll runs against the in-memory cluster and compute provider.

use std::sync::Arc;
use std::time::Duration;

use node_reroll_cluster::{ClusterCall, MockCluster};
use node_reroll_compute::MockCompute;
use node_reroll_control::{
    ControlError, RerollConfig, RerollContext, RerollOrchestrator, RunOutcome,
};
use node_reroll_core::labels::{INTERNAL_IP_ADDRESS, NODEPOOL_LABEL};
use node_reroll_core::{ClusterNode, SelectionCriteria, WorkloadPod};
use tokio::time::Instant;

fn managed(name: &str) -> ClusterNode {
    ClusterNode::new(name)
        .with_label(NODEPOOL_LABEL, "default")
        .with_provider_id(format!("aws:///us-east-1a/i-{name}"))
        .ready()
}

fn cordon(name: &str) -> ClusterCall {
    ClusterCall::Cordon(name.to_string())
}

fn evict(key: &str) -> ClusterCall {
    ClusterCall::Evict(key.to_string())
}

fn delete(name: &str) -> ClusterCall {
    ClusterCall::DeleteNode(name.to_string())
}

fn orchestrator(
    cluster: &Arc<MockCluster>,
    compute: &Arc<MockCompute>,
    config: RerollConfig,
) -> RerollOrchestrator {
    RerollOrchestrator::new(RerollContext::new(
        cluster.clone(),
        compute.clone(),
        config,
    ))
}

#[tokio::test(start_paused = true)]
async fn simulate_makes_no_changes() {
    let cluster = Arc::new(
        MockCluster::new()
            .with_node(managed("node-1"))
            .with_node(managed("node-2"))
            .with_node(managed("node-3"))
            .with_pod("node-1", WorkloadPod::new("default", "web-1")),
    );
    let compute = Arc::new(
        MockCompute::new()
            .with_instance("i-node-1", "10.0.1.1")
            .with_instance("i-node-2", "10.0.1.2"),
    );

    let report = orchestrator(&cluster, &compute, RerollConfig::default().with_simulate(true))
        .run()
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Simulated);
    assert_eq!(report.total, 3);
    assert_eq!(report.exit_code(), 0);
    assert!(cluster.calls().is_empty());
    assert!(compute.terminated().is_empty());
    assert!(compute.lookups().is_empty());
}

#[tokio::test(start_paused = true)]
async fn drain_timeout_is_retried() {
    let cluster = Arc::new(
        MockCluster::new()
            .with_node(managed("node-1"))
            .with_node(managed("node-2"))
            .with_pod("node-1", WorkloadPod::new("default", "web-1"))
            .with_protected_pod("node-2", WorkloadPod::new("default", "db-0"), 1)
            .with_auto_replace(),
    );
    let compute = Arc::new(
        MockCompute::new()
            .with_instance("i-node-1", "10.0.1.1")
            .with_instance("i-node-2", "10.0.1.2"),
    );
    let config = RerollConfig::default()
        .with_drain_timeout(60)
        .with_pause_between_nodes(30);
    let started = Instant::now();

    let report = orchestrator(&cluster, &compute, config).run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.summary_line(), "Total:2 Successful:2 Failed:0");
    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        cluster.calls(),
        vec![
            cordon("node-1"),
            evict("default/web-1"),
            delete("node-1"),
            cordon("node-2"),
            evict("default/db-0"),
            // retry pass
            cordon("node-2"),
            evict("default/db-0"),
            delete("node-2"),
        ]
    );
    assert_eq!(compute.terminated(), vec!["i-node-1", "i-node-2"]);
    assert_eq!(cluster.node_names(), vec!["replacement-1", "replacement-2"]);

    // one pause after node-1 and the drain timeout; the last retry skips its pause
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(90), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(120), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn unhealthy_cluster_stops_before_selection() {
    let cluster = Arc::new(
        MockCluster::new()
            .with_node(managed("node-1"))
            .with_node(ClusterNode::new("node-2").with_label(NODEPOOL_LABEL, "default")),
    );
    let compute = Arc::new(MockCompute::new());

    let report = orchestrator(&cluster, &compute, RerollConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Unhealthy);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(cluster.node_list_calls(), 1);
    assert!(cluster.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn persistent_failure_is_reported() {
    let cluster = Arc::new(
        MockCluster::new()
            .with_node(managed("node-1"))
            .with_node(managed("node-2"))
            .with_protected_pod("node-2", WorkloadPod::new("default", "db-0"), 5)
            .with_auto_replace(),
    );
    let compute = Arc::new(MockCompute::new());
    let config = RerollConfig::default()
        .with_drain_timeout(30)
        .with_pause_between_nodes(0);

    let report = orchestrator(&cluster, &compute, config).run().await.unwrap();

    assert_eq!(report.summary_line(), "Total:2 Successful:1 Failed:1");
    assert_eq!(report.failed, vec!["node-2"]);
    assert_eq!(report.exit_code(), 1);
    assert!(!cluster.calls().contains(&delete("node-2")));
    assert!(cluster.node_names().contains(&"node-2".to_string()));
}

#[tokio::test(start_paused = true)]
async fn delete_failure_is_retried() {
    let cluster = Arc::new(
        MockCluster::new()
            .with_node(managed("node-1"))
            .with_node(managed("node-2"))
            .failing_delete("node-1", 1)
            .with_auto_replace(),
    );
    let compute = Arc::new(
        MockCompute::new()
            .with_instance("i-node-1", "10.0.1.1")
            .with_instance("i-node-2", "10.0.1.2"),
    );
    let config = RerollConfig::default().with_pause_between_nodes(0);

    let report = orchestrator(&cluster, &compute, config).run().await.unwrap();

    assert_eq!(report.summary_line(), "Total:2 Successful:2 Failed:0");
    assert_eq!(
        cluster.calls(),
        vec![
            cordon("node-1"),
            delete("node-1"),
            cordon("node-2"),
            delete("node-2"),
            cordon("node-1"),
            delete("node-1"),
        ]
    );
    assert_eq!(compute.terminated(), vec!["i-node-2", "i-node-1"]);
}

#[tokio::test(start_paused = true)]
async fn criteria_limit_the_reroll() {
    let cluster = Arc::new(
        MockCluster::new()
            .with_node(managed("node-1").with_label("team", "platform"))
            .with_node(managed("node-2").with_label("team", "data"))
            .with_node(managed("node-3").with_label("team", "platform"))
            .with_auto_replace(),
    );
    let compute = Arc::new(MockCompute::new());
    let config = RerollConfig::default()
        .with_pause_between_nodes(0)
        .with_skip_instance_termination(true)
        .with_criteria(SelectionCriteria::new().with_label("team", "platform"));

    let report = orchestrator(&cluster, &compute, config).run().await.unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        cluster.calls(),
        vec![
            cordon("node-1"),
            delete("node-1"),
            cordon("node-3"),
            delete("node-3"),
        ]
    );
    assert!(compute.lookups().is_empty());
}

#[tokio::test(start_paused = true)]
async fn instance_found_by_private_ip() {
    let node = ClusterNode::new("node-1")
        .with_label(NODEPOOL_LABEL, "default")
        .with_address(INTERNAL_IP_ADDRESS, "10.0.1.1")
        .ready();
    let cluster = Arc::new(
        MockCluster::new()
            .with_node(node)
            .with_node(managed("node-2"))
            .with_auto_replace(),
    );
    let compute = Arc::new(
        MockCompute::new()
            .with_instance("i-0abc", "10.0.1.1")
            .with_instance("i-node-2", "10.0.1.2"),
    );
    let config = RerollConfig::default().with_pause_between_nodes(0);

    let report = orchestrator(&cluster, &compute, config).run().await.unwrap();

    assert_eq!(report.exit_code(), 0);
    assert_eq!(compute.lookups(), vec!["10.0.1.1"]);
    assert_eq!(compute.terminated(), vec!["i-0abc", "i-node-2"]);
}

#[tokio::test(start_paused = true)]
async fn termination_failure_does_not_fail_node() {
    let cluster = Arc::new(
        MockCluster::new()
            .with_node(managed("node-1"))
            .with_node(managed("node-2"))
            .with_auto_replace(),
    );
    let compute = Arc::new(
        MockCompute::new()
            .with_instance("i-node-1", "10.0.1.1")
            .unauthorized(),
    );
    let config = RerollConfig::default().with_pause_between_nodes(0);

    let report = orchestrator(&cluster, &compute, config).run().await.unwrap();

    assert_eq!(report.summary_line(), "Total:2 Successful:2 Failed:0");
    assert!(compute.terminated().is_empty());
}

#[tokio::test(start_paused = true)]
async fn no_matching_nodes() {
    let cluster = Arc::new(
        MockCluster::new()
            .with_node(ClusterNode::new("system-1").ready())
            .with_node(ClusterNode::new("system-2").ready()),
    );
    let compute = Arc::new(MockCompute::new());

    let report = orchestrator(&cluster, &compute, RerollConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::NoNodes);
    assert_eq!(report.exit_code(), 0);
    assert!(cluster.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn selection_failure_is_fatal() {
    let cluster = Arc::new(
        MockCluster::new()
            .with_node(managed("node-1"))
            .with_node(managed("node-2"))
            .failing_node_list_after(1),
    );
    let compute = Arc::new(MockCompute::new());

    let result = orchestrator(&cluster, &compute, RerollConfig::default())
        .run()
        .await;

    assert!(matches!(result, Err(ControlError::ClusterQuery(_))));
    assert!(cluster.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrency_request_is_sequential() {
    let cluster = Arc::new(
        MockCluster::new()
            .with_node(managed("node-1"))
            .with_node(managed("node-2"))
            .with_auto_replace(),
    );
    let compute = Arc::new(MockCompute::new());
    let config = RerollConfig::default()
        .with_max_concurrent(4)
        .with_pause_between_nodes(0);

    let report = orchestrator(&cluster, &compute, config).run().await.unwrap();

    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        cluster.calls(),
        vec![
            cordon("node-1"),
            delete("node-1"),
            cordon("node-2"),
            delete("node-2"),
        ]
    );
}
