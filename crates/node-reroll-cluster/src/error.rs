//! Error types for the cluster crate.

use thiserror::Error;

/// Errors that can occur when talking to the cluster control plane.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Kubernetes API error not covered by a more specific variant.
    #[error("Kubernetes API error: {0}")]
    KubeApi(#[from] kube::Error),

    /// The object no longer exists.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An eviction was refused because it would violate a disruption budget.
    #[error("Eviction of {0} blocked by a PodDisruptionBudget")]
    DisruptionBudget(String),

    /// The object returned by the API is missing a required field.
    #[error("Malformed object: {0}")]
    Malformed(String),

    /// Injected failure, used by the in-memory cluster.
    #[error("Cluster unavailable: {0}")]
    Unavailable(String),
}

impl ClusterError {
    /// The target object was already gone.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The request was rejected by disruption-budget admission.
    #[must_use]
    pub const fn is_disruption_budget(&self) -> bool {
        matches!(self, Self::DisruptionBudget(_))
    }

    /// Classify a kube error for the object `what`.
    ///
    /// 404 becomes [`ClusterError::NotFound`], 429 becomes
    /// [`ClusterError::DisruptionBudget`].
    #[must_use]
    pub fn from_kube(what: impl Into<String>, err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => Self::NotFound(what.into()),
            kube::Error::Api(resp) if resp.code == 429 => Self::DisruptionBudget(what.into()),
            _ => Self::KubeApi(err),
        }
    }
}

/// A specialized Result type for cluster operations.
pub type Result<T> = std::result::Result<T, ClusterError>;
