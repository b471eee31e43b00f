//! Transport trait and typed request/response pairs

use crate::core::{AnchorDevice, Coordinates, DeviceId, PositioningParams, SelectionMode};
use crate::hardware::{CommError, CommResult};

/// Device registers that can be persisted to flash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    PositioningNumberOfAnchors,
}

/// Operations understood by a positioning device
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Empty the device list
    ClearDevices,
    /// Append an anchor to the device list
    AddDevice(AnchorDevice),
    /// Set the anchor selection mode and number of anchors to use
    SetAnchorSelection { mode: SelectionMode, count: usize },
    /// Persist the anchor id list
    SaveAnchorIds,
    /// Persist the given registers
    SaveRegisters(Vec<Register>),
    /// Compute one position fix; blocks until the device answers
    DoPositioning(PositioningParams),
    ReadErrorCode,
    ReadNetworkId,
    ReadFirmwareVersion,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::ClearDevices => "clear_devices",
            Request::AddDevice(_) => "add_device",
            Request::SetAnchorSelection { .. } => "set_anchor_selection",
            Request::SaveAnchorIds => "save_anchor_ids",
            Request::SaveRegisters(_) => "save_registers",
            Request::DoPositioning(_) => "do_positioning",
            Request::ReadErrorCode => "read_error_code",
            Request::ReadNetworkId => "read_network_id",
            Request::ReadFirmwareVersion => "read_firmware_version",
        }
    }
}

/// Successful replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ack,
    Position(Coordinates),
    ErrorCode(u8),
    NetworkId(u16),
    /// Major version in the high nibble, minor in the low nibble
    FirmwareVersion(u8),
}

/// Serialized request/response channel to the local device and, through it,
/// to remote devices.
///
/// Implementations must answer requests strictly in order. A request that the
/// device answered with a failure status is reported as
/// [`CommError::DeviceFailure`]; anything where no answer arrived uses one of
/// the unreachable variants.
pub trait Transport {
    fn request(&mut self, device: DeviceId, request: Request) -> CommResult<Response>;

    fn clear_devices(&mut self, device: DeviceId) -> CommResult<()> {
        expect_ack(device, "clear_devices", self.request(device, Request::ClearDevices)?)
    }

    fn add_device(&mut self, device: DeviceId, anchor: AnchorDevice) -> CommResult<()> {
        expect_ack(device, "add_device", self.request(device, Request::AddDevice(anchor))?)
    }

    fn set_selection_of_anchors(
        &mut self,
        device: DeviceId,
        mode: SelectionMode,
        count: usize,
    ) -> CommResult<()> {
        let response = self.request(device, Request::SetAnchorSelection { mode, count })?;
        expect_ack(device, "set_anchor_selection", response)
    }

    fn save_anchor_ids(&mut self, device: DeviceId) -> CommResult<()> {
        expect_ack(device, "save_anchor_ids", self.request(device, Request::SaveAnchorIds)?)
    }

    fn save_registers(&mut self, device: DeviceId, registers: Vec<Register>) -> CommResult<()> {
        let response = self.request(device, Request::SaveRegisters(registers))?;
        expect_ack(device, "save_registers", response)
    }

    fn do_positioning(
        &mut self,
        device: DeviceId,
        params: PositioningParams,
    ) -> CommResult<Coordinates> {
        match self.request(device, Request::DoPositioning(params))? {
            Response::Position(position) => Ok(position),
            _ => Err(unexpected(device, "do_positioning")),
        }
    }

    fn error_code(&mut self, device: DeviceId) -> CommResult<u8> {
        match self.request(device, Request::ReadErrorCode)? {
            Response::ErrorCode(code) => Ok(code),
            _ => Err(unexpected(device, "read_error_code")),
        }
    }

    fn network_id(&mut self, device: DeviceId) -> CommResult<u16> {
        match self.request(device, Request::ReadNetworkId)? {
            Response::NetworkId(id) => Ok(id),
            _ => Err(unexpected(device, "read_network_id")),
        }
    }

    fn firmware_version(&mut self, device: DeviceId) -> CommResult<(u8, u8)> {
        match self.request(device, Request::ReadFirmwareVersion)? {
            Response::FirmwareVersion(raw) => Ok((raw >> 4, raw & 0x0f)),
            _ => Err(unexpected(device, "read_firmware_version")),
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn request(&mut self, device: DeviceId, request: Request) -> CommResult<Response> {
        (**self).request(device, request)
    }
}

fn expect_ack(device: DeviceId, operation: &str, response: Response) -> CommResult<()> {
    match response {
        Response::Ack => Ok(()),
        _ => Err(unexpected(device, operation)),
    }
}

fn unexpected(device: DeviceId, operation: &str) -> CommError {
    CommError::UnexpectedResponse {
        device,
        operation: operation.to_string(),
    }
}
