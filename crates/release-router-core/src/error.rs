use thiserror::Error;

use crate::parameter::ParameterError;

/// Failure of a single routing invocation. Surfaced to the edge platform as-is.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("invalid event: {message}")]
    InvalidEvent { message: String },
    #[error("invalid release `{value}`: {reason}")]
    InvalidRelease { value: String, reason: String },
    #[error("parameter lookup failed: {source}")]
    Parameter {
        #[from]
        source: ParameterError,
    },
}

impl ReleaseError {
    pub fn invalid_event(message: impl Into<String>) -> Self {
        ReleaseError::InvalidEvent {
            message: message.into(),
        }
    }

    pub fn invalid_release(value: impl Into<String>, reason: impl Into<String>) -> Self {
        ReleaseError::InvalidRelease {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure came from the remote parameter store.
    pub fn is_remote(&self) -> bool {
        matches!(self, ReleaseError::Parameter { .. })
    }
}
