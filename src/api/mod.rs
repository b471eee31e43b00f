//! Outbound interfaces: telemetry publishing and presentation formatting

pub mod telemetry;
pub mod formatting;

pub use telemetry::{
    publish_record, JsonLinesSink, MemorySink, PublishedRecord, SinkError, TelemetrySink, Topics,
};
pub use formatting::{
    AnchorRecord, ErrorRecord, LatencyRecord, PositionRecord, anchor_line, ceil_millis,
    position_line,
};
