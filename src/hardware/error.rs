//! Communication error types and handling

use crate::core::DeviceId;
use thiserror::Error;

/// Errors returned by a [`Transport`](crate::hardware::Transport) request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommError {
    /// The addressed device never answered
    #[error("no response from device {device}")]
    NoResponse { device: DeviceId },

    /// The transport gave up waiting for the reply
    #[error("timeout after {timeout_ms}ms waiting for device {device}")]
    Timeout { device: DeviceId, timeout_ms: u32 },

    /// The device answered with a failure status; its error register holds the reason
    #[error("device {device} reported failure for {operation}")]
    DeviceFailure { device: DeviceId, operation: String },

    /// The device answered with a payload that does not match the request
    #[error("unexpected response to {operation} from device {device}")]
    UnexpectedResponse { device: DeviceId, operation: String },

    /// Local link to the attached device failed
    #[error("transport I/O error: {details}")]
    Io { details: String },
}

/// Result type for communication operations
pub type CommResult<T> = Result<T, CommError>;

impl CommError {
    /// True when the addressed device could not be talked to at all, as opposed
    /// to a device that answered with a failure status.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            CommError::NoResponse { .. } | CommError::Timeout { .. } | CommError::Io { .. }
        )
    }
}
