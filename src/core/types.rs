//! Core data types for the multitag positioning system

use crate::core::constants::LOCAL_DEVICE_SENTINEL;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Address of a device on the shared transport.
///
/// `Local` is the device physically attached to the transport; `Remote` is
/// reached over UWB through it. Configuration files write a remote id as a
/// number and the local device as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<u16>", into = "Option<u16>")]
pub enum DeviceId {
    Local,
    Remote(u16),
}

impl DeviceId {
    pub fn is_remote(&self) -> bool {
        matches!(self, DeviceId::Remote(_))
    }

    /// Numeric id used when printing or publishing. The local device maps to
    /// the sentinel `0`; never compare devices through this value.
    pub fn presentation_id(&self) -> u16 {
        match self {
            DeviceId::Local => LOCAL_DEVICE_SENTINEL,
            DeviceId::Remote(id) => *id,
        }
    }
}

impl From<Option<u16>> for DeviceId {
    fn from(id: Option<u16>) -> Self {
        match id {
            Some(id) => DeviceId::Remote(id),
            None => DeviceId::Local,
        }
    }
}

impl From<DeviceId> for Option<u16> {
    fn from(id: DeviceId) -> Self {
        match id {
            DeviceId::Local => None,
            DeviceId::Remote(id) => Some(id),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.presentation_id())
    }
}

/// Position in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coordinates {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X: {}, Y: {}, Z: {}", self.x, self.y, self.z)
    }
}

/// Fixed reference device with a surveyed position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorDevice {
    /// Network identifier of the anchor
    pub network_id: u16,
    /// Reserved/status flag pushed with the anchor entry
    pub flag: u8,
    /// Surveyed position (mm)
    pub position: Coordinates,
}

impl AnchorDevice {
    pub fn new(network_id: u16, flag: u8, position: Coordinates) -> Self {
        Self { network_id, flag, position }
    }
}

/// One successful position computation for a tag
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    pub tag: DeviceId,
    pub position: Coordinates,
    /// Monotonic clock reading when the fix was received
    pub timestamp: Instant,
    /// Time the blocking fix request took
    pub round_trip: Duration,
}

/// Positioning dimension used by the tag's solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "2.5d")]
    TwoAndHalfD,
    #[serde(rename = "3d")]
    ThreeD,
}

/// Positioning algorithm run on the tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    UwbOnly,
    Tracking,
}

/// Parameters passed with every fix request. Fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositioningParams {
    pub dimension: Dimension,
    /// Device height (mm), used by 2.5D positioning
    pub height_mm: i32,
    pub algorithm: Algorithm,
}

impl Default for PositioningParams {
    fn default() -> Self {
        Self {
            dimension: Dimension::ThreeD,
            height_mm: crate::core::constants::DEFAULT_HEIGHT_MM,
            algorithm: Algorithm::UwbOnly,
        }
    }
}

/// Anchor selection mode on a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Fixed anchor list, at most four anchors active
    Manual,
    /// Tag picks anchors from its device list
    Automatic,
}
