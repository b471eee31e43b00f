//! Inter-fix latency tracking for one designated tag
//!
//! Intervals are collected into a fixed-size window. Once the window is full
//! the next recorded fix produces an averaged report and empties the window;
//! it never slides.

use crate::core::DeviceId;
use std::time::{Duration, Instant};

/// Averaged latency over one full window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyReport {
    pub tag: DeviceId,
    pub sample_count: usize,
    /// Mean interval in whole milliseconds, rounded up
    pub average_ms: u64,
}

#[derive(Debug, Clone)]
pub struct LatencyTracker {
    tag: DeviceId,
    sample_count: usize,
    intervals: Vec<Duration>,
    last_timestamp: Option<Instant>,
}

impl LatencyTracker {
    /// Track `tag`, averaging over `sample_count` intervals (at least one)
    pub fn new(tag: DeviceId, sample_count: usize) -> Self {
        let sample_count = sample_count.max(1);
        Self {
            tag,
            sample_count,
            intervals: Vec::with_capacity(sample_count),
            last_timestamp: None,
        }
    }

    pub fn tag(&self) -> DeviceId {
        self.tag
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Intervals currently stored in the window
    pub fn pending_samples(&self) -> usize {
        self.intervals.len()
    }

    /// Record a fix received at `now`.
    ///
    /// The first call only seeds the reference timestamp. A call made while the
    /// window is full emits the report and clears the window without storing a
    /// new interval.
    pub fn record(&mut self, now: Instant) -> Option<LatencyReport> {
        let Some(last) = self.last_timestamp else {
            self.last_timestamp = Some(now);
            return None;
        };

        if self.intervals.len() >= self.sample_count {
            let report = LatencyReport {
                tag: self.tag,
                sample_count: self.intervals.len(),
                average_ms: mean_ceil_millis(&self.intervals),
            };
            self.intervals.clear();
            return Some(report);
        }

        self.intervals.push(now.saturating_duration_since(last));
        self.last_timestamp = Some(now);
        None
    }
}

fn mean_ceil_millis(intervals: &[Duration]) -> u64 {
    if intervals.is_empty() {
        return 0;
    }
    let total: u128 = intervals.iter().map(Duration::as_nanos).sum();
    let divisor = intervals.len() as u128 * 1_000_000;
    total.div_ceil(divisor) as u64
}
