//! Diagnostic reporting for failed operations
//!
//! The addressed device is asked for its error register first. When that read
//! itself fails the device cannot explain why it is unreachable, so the local
//! device's register is read instead and the report is marked local-only.

use crate::api::ErrorRecord;
use crate::core::DeviceId;
use crate::hardware::{CommError, ErrorDecoder, Transport};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Positioning,
    Configuration,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Positioning => "positioning",
            Operation::Configuration => "configuration",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which device's error register the message was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Locality {
    /// Read from the addressed device
    Remote,
    /// Addressed device did not answer; read from the local device
    LocalFallback,
}

impl Locality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locality::Remote => "remote",
            Locality::LocalFallback => "local-fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub operation: Operation,
    pub tag: DeviceId,
    pub message: String,
    pub locality: Locality,
    /// Raw register value, absent when no register could be read
    pub code: Option<u8>,
}

impl ErrorReport {
    pub fn to_record(&self) -> ErrorRecord {
        ErrorRecord {
            id: self.tag.presentation_id(),
            operation: self.operation.as_str().to_string(),
            locality: self.locality.as_str().to_string(),
            code: self.code,
            message: self.message.clone(),
        }
    }
}

/// Renders failed operations into [`ErrorReport`]s
#[derive(Debug, Clone)]
pub struct ErrorReporter<D> {
    decoder: D,
}

impl<D: ErrorDecoder> ErrorReporter<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    pub fn report<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        operation: Operation,
        tag: DeviceId,
    ) -> ErrorReport {
        match transport.error_code(tag) {
            Ok(code) => ErrorReport {
                operation,
                tag,
                message: format!("{} error on {}: {}", operation, tag, self.decoder.decode(code)),
                locality: Locality::Remote,
                code: Some(code),
            },
            Err(remote_err) => {
                debug!(tag = %tag, error = %remote_err, "error register unreadable, falling back to local device");
                self.local_fallback(transport, operation, tag, remote_err)
            }
        }
    }

    fn local_fallback<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        operation: Operation,
        tag: DeviceId,
        remote_err: CommError,
    ) -> ErrorReport {
        // Re-reading the local device after its own read failed tells nothing new
        let local = if tag.is_remote() {
            transport.error_code(DeviceId::Local)
        } else {
            Err(remote_err)
        };

        match local {
            Ok(code) => ErrorReport {
                operation,
                tag,
                message: format!(
                    "{} error on {} (no response, local error code 0x{:02x}): {}",
                    operation,
                    tag,
                    code,
                    self.decoder.decode(code)
                ),
                locality: Locality::LocalFallback,
                code: Some(code),
            },
            Err(err) => ErrorReport {
                operation,
                tag,
                message: format!("{} error on {}, no error code available: {}", operation, tag, err),
                locality: Locality::LocalFallback,
                code: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{MockTransport, Request, TableErrorDecoder};

    fn reporter() -> ErrorReporter<TableErrorDecoder> {
        ErrorReporter::new(
            TableErrorDecoder::default()
                .with_message(0x0b, "not enough anchors")
                .with_message(0x05, "UWB receive error"),
        )
    }

    #[test]
    fn test_reachable_device_reports_remote() {
        let tag = DeviceId::Remote(0x1001);
        let mut transport = MockTransport::default();
        transport.set_error_code(tag, 0x0b);

        let report = reporter().report(&mut transport, Operation::Positioning, tag);

        assert_eq!(report.locality, Locality::Remote);
        assert_eq!(report.code, Some(0x0b));
        assert_eq!(report.message, "positioning error on 0x1001: not enough anchors");
        assert!(transport.requests_for(DeviceId::Local).is_empty());
    }

    #[test]
    fn test_unreachable_device_falls_back_to_local_register() {
        let tag = DeviceId::Remote(0x1002);
        let mut transport = MockTransport::default();
        transport.set_unreachable(tag);
        transport.set_error_code(DeviceId::Local, 0x05);

        let report = reporter().report(&mut transport, Operation::Positioning, tag);

        assert_eq!(report.locality, Locality::LocalFallback);
        assert_eq!(report.code, Some(0x05));
        assert!(report.message.contains("local error code 0x05"));
        assert_eq!(transport.requests_for(DeviceId::Local), vec![&Request::ReadErrorCode]);
    }

    #[test]
    fn test_local_fallback_without_any_register() {
        let tag = DeviceId::Remote(0x1002);
        let mut transport = MockTransport::default();
        transport.disconnect();

        let report = reporter().report(&mut transport, Operation::Configuration, tag);

        assert_eq!(report.locality, Locality::LocalFallback);
        assert_eq!(report.code, None);
        assert!(report.message.starts_with("configuration error on 0x1002"));
    }

    #[test]
    fn test_local_tag_is_not_read_twice() {
        let mut transport = MockTransport::default();
        transport.disconnect();

        let report = reporter().report(&mut transport, Operation::Positioning, DeviceId::Local);

        assert_eq!(report.locality, Locality::LocalFallback);
        assert_eq!(transport.sent_requests().len(), 1);
    }

    #[test]
    fn test_record_uses_sentinel_and_labels() {
        let mut transport = MockTransport::default();
        let report = reporter().report(&mut transport, Operation::Positioning, DeviceId::Local);
        let record = report.to_record();

        assert_eq!(record.id, 0);
        assert_eq!(record.operation, "positioning");
        assert_eq!(record.locality, "remote");
    }
}
