//! Scripted mock transport for tests

use crate::core::{Coordinates, DeviceId};
use crate::hardware::{CommError, CommResult, Request, Response, Transport};
use std::collections::{HashMap, HashSet, VecDeque};

/// Mock transport that answers every request from an in-memory script and
/// records what was sent.
#[derive(Debug, Clone)]
pub struct MockTransport {
    local_network_id: u16,
    firmware: u8,
    connected: bool,
    unreachable: HashSet<DeviceId>,
    failing_requests: Vec<(DeviceId, Request)>,
    failing_operations: HashSet<(DeviceId, &'static str)>,
    positions: HashMap<DeviceId, VecDeque<Coordinates>>,
    default_positions: HashMap<DeviceId, Coordinates>,
    error_codes: HashMap<DeviceId, u8>,
    sent: Vec<(DeviceId, Request)>,
}

impl MockTransport {
    /// Create a mock whose local device has the given network id
    pub fn new(local_network_id: u16) -> Self {
        Self {
            local_network_id,
            firmware: 0x13,
            connected: true,
            unreachable: HashSet::new(),
            failing_requests: Vec::new(),
            failing_operations: HashSet::new(),
            positions: HashMap::new(),
            default_positions: HashMap::new(),
            error_codes: HashMap::new(),
            sent: Vec::new(),
        }
    }

    /// Queue a fix for `device`; queued fixes are returned before the default
    pub fn push_position(&mut self, device: DeviceId, position: Coordinates) {
        self.positions.entry(device).or_default().push_back(position);
    }

    /// Position returned for `device` once its queue is empty
    pub fn set_default_position(&mut self, device: DeviceId, position: Coordinates) {
        self.default_positions.insert(device, position);
    }

    /// Value of the device's error-code register
    pub fn set_error_code(&mut self, device: DeviceId, code: u8) {
        self.error_codes.insert(device, code);
    }

    /// The device stops answering entirely
    pub fn set_unreachable(&mut self, device: DeviceId) {
        self.unreachable.insert(device);
    }

    pub fn set_reachable(&mut self, device: DeviceId) {
        self.unreachable.remove(&device);
    }

    /// Answer exactly this request with a failure status
    pub fn fail_on(&mut self, device: DeviceId, request: Request) {
        self.failing_requests.push((device, request));
    }

    /// Answer every request with this operation name with a failure status
    pub fn fail_operation(&mut self, device: DeviceId, operation: &'static str) {
        self.failing_operations.insert((device, operation));
    }

    /// Simulate loss of the link to the attached device
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub fn reconnect(&mut self) {
        self.connected = true;
    }

    /// All requests sent so far, including ones that were not answered
    pub fn sent_requests(&self) -> &[(DeviceId, Request)] {
        &self.sent
    }

    /// Requests sent to a single device
    pub fn requests_for(&self, device: DeviceId) -> Vec<&Request> {
        self.sent
            .iter()
            .filter(|(target, _)| *target == device)
            .map(|(_, request)| request)
            .collect()
    }

    fn should_fail(&self, device: DeviceId, request: &Request) -> bool {
        self.failing_operations.contains(&(device, request.name()))
            || self
                .failing_requests
                .iter()
                .any(|(target, failing)| *target == device && failing == request)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new(0x6000)
    }
}

impl Transport for MockTransport {
    fn request(&mut self, device: DeviceId, request: Request) -> CommResult<Response> {
        self.sent.push((device, request.clone()));

        if !self.connected {
            return Err(CommError::Io {
                details: "mock link disconnected".to_string(),
            });
        }

        if self.unreachable.contains(&device) {
            return Err(CommError::NoResponse { device });
        }

        if self.should_fail(device, &request) {
            return Err(CommError::DeviceFailure {
                device,
                operation: request.name().to_string(),
            });
        }

        let response = match request {
            Request::ClearDevices
            | Request::AddDevice(_)
            | Request::SetAnchorSelection { .. }
            | Request::SaveAnchorIds
            | Request::SaveRegisters(_) => Response::Ack,
            Request::DoPositioning(_) => {
                let queued = self.positions.get_mut(&device).and_then(|queue| queue.pop_front());
                let position = queued
                    .or_else(|| self.default_positions.get(&device).copied())
                    .unwrap_or_default();
                Response::Position(position)
            }
            Request::ReadErrorCode => {
                Response::ErrorCode(self.error_codes.get(&device).copied().unwrap_or(0))
            }
            Request::ReadNetworkId => Response::NetworkId(match device {
                DeviceId::Local => self.local_network_id,
                DeviceId::Remote(id) => id,
            }),
            Request::ReadFirmwareVersion => Response::FirmwareVersion(self.firmware),
        };

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PositioningParams;

    #[test]
    fn test_queued_positions_then_default() {
        let tag = DeviceId::Remote(0x1000);
        let mut transport = MockTransport::default();
        transport.push_position(tag, Coordinates::new(1, 2, 3));
        transport.set_default_position(tag, Coordinates::new(9, 9, 9));

        let params = PositioningParams::default();
        assert_eq!(transport.do_positioning(tag, params).unwrap(), Coordinates::new(1, 2, 3));
        assert_eq!(transport.do_positioning(tag, params).unwrap(), Coordinates::new(9, 9, 9));
    }

    #[test]
    fn test_unreachable_device_is_recorded_but_not_answered() {
        let tag = DeviceId::Remote(0x1002);
        let mut transport = MockTransport::default();
        transport.set_unreachable(tag);

        let result = transport.error_code(tag);
        assert!(matches!(result, Err(CommError::NoResponse { .. })));
        assert_eq!(transport.requests_for(tag), vec![&Request::ReadErrorCode]);
    }

    #[test]
    fn test_failing_operation_reports_device_failure() {
        let tag = DeviceId::Remote(0x1001);
        let mut transport = MockTransport::default();
        transport.fail_operation(tag, "do_positioning");

        let result = transport.do_positioning(tag, PositioningParams::default());
        assert!(matches!(result, Err(CommError::DeviceFailure { .. })));
        assert!(transport.clear_devices(tag).is_ok());
    }

    #[test]
    fn test_disconnect_fails_every_device() {
        let mut transport = MockTransport::default();
        transport.disconnect();
        assert!(matches!(transport.error_code(DeviceId::Local), Err(CommError::Io { .. })));

        transport.reconnect();
        assert_eq!(transport.network_id(DeviceId::Local).unwrap(), 0x6000);
    }
}
