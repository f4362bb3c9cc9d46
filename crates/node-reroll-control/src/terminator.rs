//! Instance termination.

use std::sync::Arc;

use node_reroll_compute::ComputeProvider;
use tracing::{error, info, warn};

/// Terminates compute instances, treating an already-gone instance as done.
#[derive(Clone)]
pub struct InstanceTerminator {
    compute: Arc<dyn ComputeProvider>,
    simulate: bool,
}

impl InstanceTerminator {
    /// Create a terminator.
    #[must_use]
    pub fn new(compute: Arc<dyn ComputeProvider>, simulate: bool) -> Self {
        Self { compute, simulate }
    }

    /// Terminate `instance_id`. Never fails the caller; returns whether the
    /// instance is gone or going.
    pub async fn terminate(&self, instance_id: &str) -> bool {
        if self.simulate {
            info!(instance_id, "[DRY RUN] Would terminate instance");
            return true;
        }

        match self.compute.terminate_instance(instance_id).await {
            Ok(()) => true,
            Err(e) if e.is_not_found() => {
                info!(instance_id, "Instance already terminated");
                true
            }
            Err(e) if e.is_unauthorized() => {
                error!(
                    instance_id,
                    error = %e,
                    "Not authorized to terminate instance, terminate it manually"
                );
                false
            }
            Err(e) => {
                warn!(instance_id, error = %e, "Error terminating instance");
                false
            }
        }
    }
}
