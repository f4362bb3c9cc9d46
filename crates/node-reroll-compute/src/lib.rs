//! # node-reroll compute provider
//!
//! Maps cluster nodes back to the EC2 instances underneath them and
//! terminates those instances once the node object is gone.
//!
//! ```text
//! node-reroll-control
//!   └── ComputeProvider (trait)
//!         ├── Ec2Provider   → aws-sdk-ec2
//!         └── MockCompute   (feature "test-utils")
//! ```
//!
//! Provider errors are classified into [`ComputeError::NotFound`] (already
//! gone), [`ComputeError::Unauthorized`] (operator must fix IAM) and
//! [`ComputeError::Provider`] (anything else).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ec2;
pub mod error;

pub use ec2::{ComputeProvider, Ec2Provider};
pub use error::{ComputeError, Result};

#[cfg(any(test, feature = "test-utils"))]
pub use ec2::mock::MockCompute;
