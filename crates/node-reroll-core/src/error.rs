//! Common error types for node-reroll.
//!
//! These errors describe malformed input that never reaches the cluster.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors shared across node-reroll crates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A `--label` argument was not of the form `key=value`.
    #[error("invalid label format: {0} (expected key=value)")]
    InvalidLabelFilter(String),
}
