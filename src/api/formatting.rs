//! Presentation-boundary formatting
//!
//! Records carry `DeviceId::presentation_id` and text lines use the
//! `DeviceId` display form, so the local device becomes the sentinel `0`.

use crate::core::{AnchorDevice, PositionFix};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Published form of a position fix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: u16,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Round trip of the fix request (ms, rounded up)
    pub lat: u64,
}

impl From<&PositionFix> for PositionRecord {
    fn from(fix: &PositionFix) -> Self {
        Self {
            id: fix.tag.presentation_id(),
            x: fix.position.x,
            y: fix.position.y,
            z: fix.position.z,
            lat: ceil_millis(fix.round_trip),
        }
    }
}

/// Published form of a configured anchor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub id: u16,
    pub flag: u8,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl From<&AnchorDevice> for AnchorRecord {
    fn from(anchor: &AnchorDevice) -> Self {
        Self {
            id: anchor.network_id,
            flag: anchor.flag,
            x: anchor.position.x,
            y: anchor.position.y,
            z: anchor.position.z,
        }
    }
}

/// Published form of an averaged latency window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyRecord {
    pub id: u16,
    pub samples: usize,
    pub average_ms: u64,
}

/// Published form of a diagnostic error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: u16,
    pub operation: String,
    pub locality: String,
    pub code: Option<u8>,
    pub message: String,
}

/// Duration in whole milliseconds, rounded up
pub fn ceil_millis(duration: Duration) -> u64 {
    duration.as_nanos().div_ceil(1_000_000) as u64
}

pub fn position_line(fix: &PositionFix) -> String {
    format!(
        "POS ID: {}, x(mm): {}, y(mm): {}, z(mm): {}",
        fix.tag,
        fix.position.x,
        fix.position.y,
        fix.position.z
    )
}

pub fn anchor_line(anchor: &AnchorDevice) -> String {
    format!("ANCHOR,0x{:04x},{}", anchor.network_id, anchor.position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Coordinates, DeviceId};
    use std::time::Instant;

    fn fix(tag: DeviceId, round_trip: Duration) -> PositionFix {
        PositionFix {
            tag,
            position: Coordinates::new(100, -200, 2500),
            timestamp: Instant::now(),
            round_trip,
        }
    }

    #[test]
    fn test_local_fix_record_uses_sentinel() {
        let record = PositionRecord::from(&fix(DeviceId::Local, Duration::from_millis(12)));
        assert_eq!(record.id, 0);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 0);
        assert!(!json["id"].is_null());
    }

    #[test]
    fn test_round_trip_rounds_up() {
        assert_eq!(ceil_millis(Duration::from_micros(12_001)), 13);
        assert_eq!(ceil_millis(Duration::from_millis(12)), 12);
        assert_eq!(ceil_millis(Duration::ZERO), 0);
    }

    #[test]
    fn test_text_lines() {
        let line = position_line(&fix(DeviceId::Remote(0x1000), Duration::ZERO));
        assert_eq!(line, "POS ID: 0x1000, x(mm): 100, y(mm): -200, z(mm): 2500");

        let local = position_line(&fix(DeviceId::Local, Duration::ZERO));
        assert!(local.starts_with("POS ID: 0x0000,"));

        let anchor = AnchorDevice::new(0x6968, 1, Coordinates::new(0, 3100, 2500));
        assert_eq!(anchor_line(&anchor), "ANCHOR,0x6968,X: 0, Y: 3100, Z: 2500");
    }
}
