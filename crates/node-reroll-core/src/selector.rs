//! Node selection criteria.
//!
//! A node is selected when it is provisioner-managed and every criteria entry
//! matches one of its labels exactly.

use crate::error::{CoreError, Result};
use crate::labels::NODEPOOL_LABEL;
use crate::node::ClusterNode;

/// Exact-match label predicate applied on top of the provisioner marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    labels: Vec<(String, String)>,
}

impl SelectionCriteria {
    /// Criteria that match every provisioner-managed node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key=value`. A later entry for the same key replaces the earlier one.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.labels.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.labels.push((key, value));
        }
        self
    }

    /// Restrict to a single node pool.
    #[must_use]
    pub fn with_node_pool(self, pool: impl Into<String>) -> Self {
        self.with_label(NODEPOOL_LABEL, pool)
    }

    /// Number of label requirements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when no label requirement is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate over the label requirements.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check the label requirements only.
    #[must_use]
    pub fn matches_labels(&self, node: &ClusterNode) -> bool {
        self.iter().all(|(k, v)| node.label(k) == Some(v))
    }

    /// Full selection predicate: provisioner-managed and matching every label.
    #[must_use]
    pub fn selects(&self, node: &ClusterNode) -> bool {
        node.is_provisioner_managed() && self.matches_labels(node)
    }
}

/// Parse a `key=value` label filter, splitting on the first `=`.
///
/// # Errors
///
/// Returns `CoreError::InvalidLabelFilter` if there is no `=` or the key is empty.
pub fn parse_label_filter(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CoreError::InvalidLabelFilter(raw.to_string())),
    }
}
