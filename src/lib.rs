//! Multitag UWB Positioning
//!
//! Drives a set of UWB tags through a single attached device: every tag is
//! given the same anchor set once, then polled round-robin for fixes. Fixes
//! are published as telemetry or folded into latency reports, and failures
//! are diagnosed from the devices' error registers.

pub mod core;
pub mod hardware;
pub mod api;
pub mod positioning;
pub mod utils;

// Re-export commonly used types
pub use core::{AnchorDevice, Coordinates, DeviceId, Dimension, PositionFix, PositioningParams};
pub use hardware::{
    CommError, CommResult, ErrorDecoder, MockTransport, SimulatedTransport, SimulationConfig,
    TableErrorDecoder, Transport,
};
pub use api::{JsonLinesSink, MemorySink, SinkError, TelemetrySink, Topics};
pub use positioning::{
    AnchorConfigurator, CancellationToken, ConfigurationResult, ErrorReport, ErrorReporter,
    LatencyReport, LatencyTracker, Locality, PositionPublisher, PositioningScheduler, RunMode,
    RunSummary, SchedulerSettings, TagOutcome,
};
pub use utils::{AppConfig, ConfigError};
