//! Error types for compute provider operations.

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Compute result type.
pub type Result<T> = std::result::Result<T, ComputeError>;

/// EC2 error code for an instance id that does not exist (or no longer exists).
pub const INSTANCE_NOT_FOUND_CODE: &str = "InvalidInstanceID.NotFound";

/// Errors that can occur when talking to the compute provider.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ComputeError {
    /// Instance does not exist, e.g. already terminated and reaped.
    #[error("Instance {0} not found")]
    NotFound(String),

    /// Credentials lack permission for the operation.
    #[error("Not authorized to operate on {target}: {detail}")]
    Unauthorized {
        /// Instance id or lookup key.
        target: String,
        /// Provider message.
        detail: String,
    },

    /// Any other provider error.
    #[error("Compute provider error for {target}: {detail}")]
    Provider {
        /// Instance id or lookup key.
        target: String,
        /// Provider message.
        detail: String,
    },
}

impl ComputeError {
    /// Classify a provider error code.
    #[must_use]
    pub fn classify(
        target: impl Into<String>,
        code: Option<&str>,
        detail: impl Into<String>,
    ) -> Self {
        let target = target.into();
        match code {
            Some(INSTANCE_NOT_FOUND_CODE) => Self::NotFound(target),
            Some(c)
                if c == "UnauthorizedOperation"
                    || c == "AuthFailure"
                    || c.starts_with("AccessDenied") =>
            {
                Self::Unauthorized {
                    target,
                    detail: detail.into(),
                }
            }
            _ => Self::Provider {
                target,
                detail: detail.into(),
            },
        }
    }

    /// Convert from an EC2 SDK error.
    #[must_use]
    pub fn from_sdk<E, R>(target: impl Into<String>, err: &SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        let code = err.as_service_error().and_then(|e| e.code());
        Self::classify(target, code, DisplayErrorContext(err).to_string())
    }

    /// The instance was already gone.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The credentials lack permission.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
