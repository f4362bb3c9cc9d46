//! Well-known label and annotation keys.

/// Marker label set by Karpenter v1beta1 and later on every node it provisions.
pub const NODEPOOL_LABEL: &str = "karpenter.sh/nodepool";

/// Marker label set by Karpenter v1alpha5 on every node it provisions.
pub const PROVISIONER_NAME_LABEL: &str = "karpenter.sh/provisioner-name";

/// Both marker labels, current name first.
pub const PROVISIONER_MARKER_LABELS: [&str; 2] = [NODEPOOL_LABEL, PROVISIONER_NAME_LABEL];

/// Standard label carrying the instance type of the node.
pub const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";

/// Annotations that may carry the compute instance id, in lookup order.
pub const INSTANCE_ID_ANNOTATIONS: [&str; 2] = [
    "karpenter.k8s.aws/instance-id",
    "node.kubernetes.io/instance-id",
];

/// Annotation present on mirror pods created from a node's static manifests.
pub const MIRROR_POD_ANNOTATION: &str = "kubernetes.io/config.mirror";

/// Owner kind of pods that run once per node.
pub const DAEMON_WORKLOAD_KIND: &str = "DaemonSet";

/// Node condition type signalling readiness.
pub const READY_CONDITION: &str = "Ready";

/// Node address type for the private network address.
pub const INTERNAL_IP_ADDRESS: &str = "InternalIP";
