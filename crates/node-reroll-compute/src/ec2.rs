//! EC2 instance lookup and termination.
//!
//! The reroll only needs two compute operations: find the instance behind a
//! node's private IP, and terminate an instance by id.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::config::Region;
use aws_sdk_ec2::{types::Filter, Client};
use tracing::{debug, info};

use crate::error::{ComputeError, Result};

/// Instance states considered live for IP lookup.
const LIVE_STATES: [&str; 2] = ["running", "pending"];

/// Compute provider operations used by the reroll.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Find a running or pending instance with the given private IP.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup call fails.
    async fn find_instance_by_private_ip(&self, private_ip: &str) -> Result<Option<String>>;

    /// Terminate an instance.
    ///
    /// # Errors
    ///
    /// Returns `ComputeError::NotFound` if the instance is already gone.
    async fn terminate_instance(&self, instance_id: &str) -> Result<()>;
}

/// EC2-backed compute provider.
#[derive(Clone)]
pub struct Ec2Provider {
    client: Client,
}

impl Ec2Provider {
    /// Create a provider from the default credential chain.
    ///
    /// Region falls back to the environment / profile when `region` is `None`.
    pub async fn new(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            debug!("Creating EC2 client for region: {}", region);
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;
        Self::with_client(Client::new(&config))
    }

    /// Create a provider around an existing EC2 client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ComputeProvider for Ec2Provider {
    async fn find_instance_by_private_ip(&self, private_ip: &str) -> Result<Option<String>> {
        let ip_filter = Filter::builder()
            .name("private-ip-address")
            .values(private_ip)
            .build();

        let state_filter = Filter::builder()
            .name("instance-state-name")
            .set_values(Some(LIVE_STATES.iter().map(ToString::to_string).collect()))
            .build();

        let response = self
            .client
            .describe_instances()
            .filters(ip_filter)
            .filters(state_filter)
            .send()
            .await
            .map_err(|e| ComputeError::from_sdk(private_ip, &e))?;

        let instance_id = response
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .find_map(|i| i.instance_id().map(ToString::to_string));

        debug!(private_ip, instance_id = ?instance_id, "Looked up instance by private IP");
        Ok(instance_id)
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        info!("Terminating instance {}", instance_id);

        self.client
            .terminate_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|e| ComputeError::from_sdk(instance_id, &e))?;

        info!("Instance {} termination initiated", instance_id);
        Ok(())
    }
}

/// In-memory compute provider for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct State {
        instances: Vec<(String, String)>,
        terminated: Vec<String>,
        lookups: Vec<String>,
        unauthorized: bool,
        failing_lookups: bool,
    }

    /// Compute provider holding `(instance id, private ip)` pairs in memory.
    #[derive(Default)]
    pub struct MockCompute {
        state: Mutex<State>,
    }

    impl MockCompute {
        /// Create an empty provider.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a live instance.
        #[must_use]
        pub fn with_instance(self, instance_id: &str, private_ip: &str) -> Self {
            self.state
                .lock()
                .instances
                .push((instance_id.to_string(), private_ip.to_string()));
            self
        }

        /// Reject every termination as unauthorized.
        #[must_use]
        pub fn unauthorized(self) -> Self {
            self.state.lock().unauthorized = true;
            self
        }

        /// Fail every IP lookup.
        #[must_use]
        pub fn failing_lookups(self) -> Self {
            self.state.lock().failing_lookups = true;
            self
        }

        /// Instance ids terminated so far.
        #[must_use]
        pub fn terminated(&self) -> Vec<String> {
            self.state.lock().terminated.clone()
        }

        /// Private IPs looked up so far.
        #[must_use]
        pub fn lookups(&self) -> Vec<String> {
            self.state.lock().lookups.clone()
        }
    }

    #[async_trait]
    impl ComputeProvider for MockCompute {
        async fn find_instance_by_private_ip(&self, private_ip: &str) -> Result<Option<String>> {
            let mut state = self.state.lock();
            state.lookups.push(private_ip.to_string());
            if state.failing_lookups {
                return Err(ComputeError::Provider {
                    target: private_ip.to_string(),
                    detail: "lookup failed".to_string(),
                });
            }
            Ok(state
                .instances
                .iter()
                .find(|(_, ip)| ip == private_ip)
                .map(|(id, _)| id.clone()))
        }

        async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
            let mut state = self.state.lock();
            if state.unauthorized {
                return Err(ComputeError::Unauthorized {
                    target: instance_id.to_string(),
                    detail: "UnauthorizedOperation".to_string(),
                });
            }
            let index = state
                .instances
                .iter()
                .position(|(id, _)| id == instance_id)
                .ok_or_else(|| ComputeError::NotFound(instance_id.to_string()))?;
            state.instances.remove(index);
            state.terminated.push(instance_id.to_string());
            Ok(())
        }
    }
}
