//! Device limits and deployment defaults

/// Most anchors a tag can use simultaneously in manual selection mode
pub const MANUAL_SELECTION_MAX_ANCHORS: usize = 4;

/// Minimum anchors for a geometrically valid 3D fix
pub const MIN_ANCHORS: usize = 3;

/// Id printed and published for the local device
pub const LOCAL_DEVICE_SENTINEL: u16 = 0;

/// Default device height (mm) for 2.5D positioning
pub const DEFAULT_HEIGHT_MM: i32 = 2500;

/// Default number of intervals averaged per latency report
pub const DEFAULT_LATENCY_SAMPLES: usize = 50;

/// Default telemetry topic prefix
pub const DEFAULT_TOPIC_PREFIX: &str = "zwerm3";

/// Anchors closer than this (mm) are flagged during validation
pub const MIN_ANCHOR_SPACING_MM: f64 = 100.0;
