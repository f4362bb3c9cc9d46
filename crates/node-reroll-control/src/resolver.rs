//! Node to instance resolution.
//!
//! Strategies, first match wins:
//!
//! 1. the node's provider id, `<scheme>://<path>/<instance-id>`
//! 2. the instance id annotations written by the provisioner
//! 3. a compute lookup for each internal IP of the node

use std::sync::Arc;

use node_reroll_compute::ComputeProvider;
use node_reroll_core::ClusterNode;
use tracing::{debug, warn};

/// Extract the instance id from a provider id like `aws:///us-east-1a/i-0abc`.
#[must_use]
pub fn instance_id_from_provider_id(provider_id: &str) -> Option<&str> {
    let (_, path) = provider_id.split_once("://")?;
    path.rsplit('/').next().filter(|id| !id.is_empty())
}

/// Maps cluster nodes to compute instance ids.
#[derive(Clone)]
pub struct InstanceResolver {
    compute: Arc<dyn ComputeProvider>,
}

impl InstanceResolver {
    /// Create a resolver backed by `compute` for IP lookups.
    #[must_use]
    pub fn new(compute: Arc<dyn ComputeProvider>) -> Self {
        Self { compute }
    }

    /// Resolve from node metadata only, without calling the compute provider.
    #[must_use]
    pub fn resolve_local(node: &ClusterNode) -> Option<String> {
        if let Some(id) = node
            .provider_id
            .as_deref()
            .and_then(instance_id_from_provider_id)
        {
            return Some(id.to_string());
        }
        node.instance_id_annotation().map(ToString::to_string)
    }

    /// Resolve the instance behind `node`, falling back to IP lookups.
    pub async fn resolve(&self, node: &ClusterNode) -> Option<String> {
        if let Some(id) = Self::resolve_local(node) {
            debug!(node = %node.name, instance_id = %id, "Resolved instance from node metadata");
            return Some(id);
        }

        for ip in node.internal_ips() {
            match self.compute.find_instance_by_private_ip(ip).await {
                Ok(Some(id)) => {
                    debug!(
                        node = %node.name,
                        ip,
                        instance_id = %id,
                        "Resolved instance by private IP"
                    );
                    return Some(id);
                }
                Ok(None) => debug!(node = %node.name, ip, "No live instance with private IP"),
                Err(e) => {
                    warn!(node = %node.name, ip, error = %e, "Error looking up instance by IP");
                }
            }
        }

        warn!(node = %node.name, "Could not find instance ID for node");
        None
    }
}
