//! Workload pod snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::labels::{DAEMON_WORKLOAD_KIND, MIRROR_POD_ANNOTATION};

/// Reference to the controller or object owning a pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    /// Owner kind, e.g. `ReplicaSet` or `DaemonSet`.
    pub kind: String,
    /// Owner name.
    pub name: String,
}

/// Read-only snapshot of a pod scheduled on a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadPod {
    /// Pod namespace.
    pub namespace: String,
    /// Pod name.
    pub name: String,
    /// Owner references.
    pub owners: Vec<OwnerRef>,
    /// Set once termination of the pod has been requested.
    pub deletion_timestamp: Option<DateTime<Utc>>,
    /// Pod annotations.
    pub annotations: BTreeMap<String, String>,
}

impl WorkloadPod {
    /// Create a pod snapshot with no owners or annotations.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add an owner reference.
    #[must_use]
    pub fn owned_by(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.owners.push(OwnerRef {
            kind: kind.into(),
            name: name.into(),
        });
        self
    }

    /// Add an annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Mark the pod as terminating.
    #[must_use]
    pub fn terminating_since(mut self, at: DateTime<Utc>) -> Self {
        self.deletion_timestamp = Some(at);
        self
    }

    /// `namespace/name`, for logging and bookkeeping.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Termination has already been requested.
    #[must_use]
    pub const fn is_terminating(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    /// Owned by a workload that runs one replica per node.
    #[must_use]
    pub fn is_daemon_workload(&self) -> bool {
        self.owners.iter().any(|o| o.kind == DAEMON_WORKLOAD_KIND)
    }

    /// Static pod mirrored from the node's local manifests.
    #[must_use]
    pub fn is_mirror(&self) -> bool {
        self.annotations.contains_key(MIRROR_POD_ANNOTATION)
    }

    /// Whether a drain should request eviction of this pod.
    #[must_use]
    pub fn is_evictable(&self) -> bool {
        !self.is_terminating() && !self.is_daemon_workload() && !self.is_mirror()
    }
}
