//! Cluster node snapshot.
//!
//! A [`ClusterNode`] is a plain value copied out of the control plane. The
//! orchestrator never mutates it; cordon and delete are requests issued through
//! the cluster API.

use std::collections::BTreeMap;

use crate::labels::{
    INSTANCE_ID_ANNOTATIONS, INSTANCE_TYPE_LABEL, INTERNAL_IP_ADDRESS, NODEPOOL_LABEL,
    PROVISIONER_MARKER_LABELS, PROVISIONER_NAME_LABEL, READY_CONDITION,
};

/// A single entry of a node's condition set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCondition {
    /// Condition type, e.g. `Ready` or `MemoryPressure`.
    pub type_: String,
    /// `True`, `False` or `Unknown`.
    pub status: String,
}

/// A network address reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    /// Address type, e.g. `InternalIP` or `Hostname`.
    pub type_: String,
    /// The address itself.
    pub address: String,
}

/// Read-only snapshot of a cluster worker node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterNode {
    /// Node name, unique within the cluster.
    pub name: String,
    /// Node labels.
    pub labels: BTreeMap<String, String>,
    /// Node annotations.
    pub annotations: BTreeMap<String, String>,
    /// Condition set from the node status.
    pub conditions: Vec<NodeCondition>,
    /// Network addresses from the node status.
    pub addresses: Vec<NodeAddress>,
    /// Provider-assigned identifier, e.g. `aws:///us-east-1a/i-0abc`.
    pub provider_id: Option<String>,
    /// Whether the node is currently cordoned.
    pub unschedulable: bool,
}

impl ClusterNode {
    /// Create an empty node snapshot with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add an annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Add a condition.
    #[must_use]
    pub fn with_condition(mut self, type_: impl Into<String>, status: impl Into<String>) -> Self {
        self.conditions.push(NodeCondition {
            type_: type_.into(),
            status: status.into(),
        });
        self
    }

    /// Mark the node `Ready=True`.
    #[must_use]
    pub fn ready(self) -> Self {
        self.with_condition(READY_CONDITION, "True")
    }

    /// Add an address.
    #[must_use]
    pub fn with_address(mut self, type_: impl Into<String>, address: impl Into<String>) -> Self {
        self.addresses.push(NodeAddress {
            type_: type_.into(),
            address: address.into(),
        });
        self
    }

    /// Set the provider id.
    #[must_use]
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    /// Look up a label value.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Check whether the node carries a `Ready=True` condition.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.type_ == READY_CONDITION && c.status == "True")
    }

    /// Check whether the node is managed by the provisioner.
    ///
    /// Either marker label qualifies, as long as its value is non-empty after
    /// trimming whitespace.
    #[must_use]
    pub fn is_provisioner_managed(&self) -> bool {
        PROVISIONER_MARKER_LABELS
            .iter()
            .any(|key| self.label(key).is_some_and(|v| !v.trim().is_empty()))
    }

    /// Name of the node pool that owns this node, if any.
    #[must_use]
    pub fn node_pool(&self) -> Option<&str> {
        [NODEPOOL_LABEL, PROVISIONER_NAME_LABEL]
            .iter()
            .filter_map(|key| self.label(key))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    /// Instance type label, if present.
    #[must_use]
    pub fn instance_type(&self) -> Option<&str> {
        self.label(INSTANCE_TYPE_LABEL)
    }

    /// Internal IP addresses, in the order reported by the node.
    pub fn internal_ips(&self) -> impl Iterator<Item = &str> {
        self.addresses
            .iter()
            .filter(|a| a.type_ == INTERNAL_IP_ADDRESS)
            .map(|a| a.address.as_str())
    }

    /// First non-empty instance id annotation, in lookup order.
    #[must_use]
    pub fn instance_id_annotation(&self) -> Option<&str> {
        INSTANCE_ID_ANNOTATIONS
            .iter()
            .filter_map(|key| self.annotations.get(*key))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }
}
