//! Conversion from Kubernetes API objects to node-reroll value types.
//!
//! Only the fields the orchestrator reads are copied; everything else on the
//! `Node` and `Pod` objects is dropped.

use k8s_openapi::api::core::v1::{Node, Pod};
use node_reroll_core::{ClusterNode, NodeAddress, NodeCondition, OwnerRef, WorkloadPod};

use crate::{ClusterError, Result};

/// Build a [`ClusterNode`] snapshot from a Kubernetes `Node`.
///
/// # Errors
///
/// Returns `ClusterError::Malformed` if the node has no name.
pub fn cluster_node(node: &Node) -> Result<ClusterNode> {
    let name = node
        .metadata
        .name
        .clone()
        .ok_or_else(|| ClusterError::Malformed("node has no name".to_string()))?;

    let spec = node.spec.as_ref();
    let status = node.status.as_ref();

    let conditions = status
        .and_then(|s| s.conditions.as_ref())
        .into_iter()
        .flatten()
        .map(|c| NodeCondition {
            type_: c.type_.clone(),
            status: c.status.clone(),
        })
        .collect();

    let addresses = status
        .and_then(|s| s.addresses.as_ref())
        .into_iter()
        .flatten()
        .map(|a| NodeAddress {
            type_: a.type_.clone(),
            address: a.address.clone(),
        })
        .collect();

    Ok(ClusterNode {
        name,
        labels: node.metadata.labels.clone().unwrap_or_default(),
        annotations: node.metadata.annotations.clone().unwrap_or_default(),
        conditions,
        addresses,
        provider_id: spec.and_then(|s| s.provider_id.clone()),
        unschedulable: spec.and_then(|s| s.unschedulable).unwrap_or(false),
    })
}

/// Build a [`WorkloadPod`] snapshot from a Kubernetes `Pod`.
///
/// # Errors
///
/// Returns `ClusterError::Malformed` if the pod has no name.
pub fn workload_pod(pod: &Pod) -> Result<WorkloadPod> {
    let name = pod
        .metadata
        .name
        .clone()
        .ok_or_else(|| ClusterError::Malformed("pod has no name".to_string()))?;

    let owners = pod
        .metadata
        .owner_references
        .as_ref()
        .into_iter()
        .flatten()
        .map(|r| OwnerRef {
            kind: r.kind.clone(),
            name: r.name.clone(),
        })
        .collect();

    Ok(WorkloadPod {
        namespace: pod
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string()),
        name,
        owners,
        deletion_timestamp: pod.metadata.deletion_timestamp.as_ref().map(|t| t.0),
        annotations: pod.metadata.annotations.clone().unwrap_or_default(),
    })
}
