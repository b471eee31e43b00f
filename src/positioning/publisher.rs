//! Visibility filtering and publication of position fixes

use crate::api::{position_line, publish_record, PositionRecord, SinkError, TelemetrySink};
use crate::core::{DeviceId, PositionFix};
use std::collections::HashSet;
use tracing::info;

/// What happened to a fix handed to the publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Forwarded,
    /// Tag is outside the visibility set
    Suppressed,
}

/// Forwards fixes of visible tags to the telemetry sink.
/// An empty visibility set makes every tag visible.
#[derive(Debug, Clone)]
pub struct PositionPublisher {
    visibility: HashSet<DeviceId>,
    topic: String,
}

impl PositionPublisher {
    pub fn new(visibility: impl IntoIterator<Item = DeviceId>, topic: impl Into<String>) -> Self {
        Self {
            visibility: visibility.into_iter().collect(),
            topic: topic.into(),
        }
    }

    pub fn is_visible(&self, tag: DeviceId) -> bool {
        self.visibility.is_empty() || self.visibility.contains(&tag)
    }

    pub fn publish<S: TelemetrySink + ?Sized>(
        &self,
        sink: &mut S,
        fix: &PositionFix,
    ) -> Result<PublishOutcome, SinkError> {
        if !self.is_visible(fix.tag) {
            return Ok(PublishOutcome::Suppressed);
        }

        info!("{}", position_line(fix));
        publish_record(sink, &self.topic, &PositionRecord::from(fix))?;
        Ok(PublishOutcome::Forwarded)
    }
}
