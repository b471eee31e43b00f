//! Top-level positioning loop
//!
//! Configures every tag once, then polls the tags in order forever. Each fix
//! is routed by the session's run mode; each failure goes to the error
//! reporter. Nothing inside a cycle aborts the loop.
//!
//! The scheduler owns the transport and lends it out one call at a time, so
//! requests to different tags can never overlap.

use crate::api::{anchor_line, publish_record, AnchorRecord, LatencyRecord, TelemetrySink, Topics};
use crate::core::{AnchorDevice, DeviceId, PositionFix, PositioningParams};
use crate::hardware::{ErrorDecoder, Transport};
use crate::positioning::{
    AnchorConfigurator, CancellationToken, ConfigurationResult, ErrorReport, ErrorReporter,
    LatencyReport, LatencyTracker, Operation, PositionPublisher, PublishOutcome,
};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Routing of successful fixes, fixed for a whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Publish fixes of visible tags
    Publish,
    /// Measure inter-fix latency of one tag; no fixes are published
    Latency { tag: DeviceId, sample_count: usize },
}

/// Static inputs of a scheduler session
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub tags: Vec<DeviceId>,
    pub anchors: Vec<AnchorDevice>,
    pub params: PositioningParams,
    pub mode: RunMode,
    /// Tags whose fixes are published; empty means all
    pub visibility: Vec<DeviceId>,
    pub persist: bool,
    pub topics: Topics,
}

/// Identity read from a device at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device: DeviceId,
    pub network_id: u16,
    pub firmware: (u8, u8),
}

/// What happened to one tag in one cycle
#[derive(Debug, Clone, PartialEq)]
pub enum TagOutcome {
    Published,
    /// Fix was visible but the sink did not accept it
    PublishFailed,
    Suppressed,
    LatencySample,
    LatencyReport(LatencyReport),
    /// Fix received in latency mode for a tag that is not being measured
    Ignored,
    Failed(ErrorReport),
}

/// Outcomes of one pass over the tag list, in polling order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleSummary {
    pub outcomes: Vec<(DeviceId, TagOutcome)>,
}

impl CycleSummary {
    pub fn published(&self) -> usize {
        self.count(|o| matches!(o, TagOutcome::Published))
    }

    pub fn failures(&self) -> usize {
        self.count(|o| matches!(o, TagOutcome::Failed(_)))
    }

    pub fn latency_reports(&self) -> Vec<LatencyReport> {
        self.outcomes
            .iter()
            .filter_map(|(_, o)| match o {
                TagOutcome::LatencyReport(report) => Some(*report),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&TagOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Totals of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub fixes: u64,
    pub failures: u64,
}

impl RunSummary {
    fn add(&mut self, cycle: &CycleSummary) {
        self.cycles += 1;
        self.failures += cycle.failures() as u64;
        self.fixes += (cycle.outcomes.len() - cycle.failures()) as u64;
    }
}

enum FixRoute {
    Publish(PositionPublisher),
    Latency(LatencyTracker),
}

pub struct PositioningScheduler<T, D, S> {
    transport: T,
    sink: S,
    reporter: ErrorReporter<D>,
    configurator: AnchorConfigurator,
    tags: Vec<DeviceId>,
    anchors: Vec<AnchorDevice>,
    params: PositioningParams,
    route: FixRoute,
    topics: Topics,
    configured: bool,
}

impl<T, D, S> PositioningScheduler<T, D, S>
where
    T: Transport,
    D: ErrorDecoder,
    S: TelemetrySink,
{
    pub fn new(settings: SchedulerSettings, transport: T, decoder: D, sink: S) -> Self {
        let route = match settings.mode {
            RunMode::Publish => {
                FixRoute::Publish(PositionPublisher::new(settings.visibility, settings.topics.position()))
            }
            RunMode::Latency { tag, sample_count } => {
                FixRoute::Latency(LatencyTracker::new(tag, sample_count))
            }
        };

        Self {
            transport,
            sink,
            reporter: ErrorReporter::new(decoder),
            configurator: AnchorConfigurator::new(settings.persist),
            tags: settings.tags,
            anchors: settings.anchors,
            params: settings.params,
            route,
            topics: settings.topics,
            configured: false,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Probe devices, announce the anchor set and configure every tag.
    /// Runs automatically before the first cycle if not called explicitly.
    pub fn setup(&mut self) -> Vec<ConfigurationResult> {
        self.probe_devices();

        for anchor in &self.anchors {
            info!("{}", anchor_line(anchor));
        }
        let records: Vec<AnchorRecord> = self.anchors.iter().map(AnchorRecord::from).collect();
        let topic = self.topics.anchors();
        self.emit(&topic, &records);

        let mut results = Vec::with_capacity(self.tags.len());
        for tag in self.tags.clone() {
            let result = self.configurator.configure(&mut self.transport, tag, &self.anchors);
            if result.success {
                info!(tag = %tag, "configuration of tag {}: success", tag);
            } else {
                self.report_failure(Operation::Configuration, tag);
            }
            results.push(result);
        }

        self.configured = true;
        results
    }

    /// Read network id and firmware version of the local device and every tag
    pub fn probe_devices(&mut self) -> Vec<DeviceInfo> {
        let mut devices = Vec::with_capacity(self.tags.len() + 1);
        if !self.tags.contains(&DeviceId::Local) {
            devices.push(DeviceId::Local);
        }
        devices.extend(self.tags.iter().copied());

        let mut found = Vec::with_capacity(devices.len());
        for device in devices {
            let info = self.transport.network_id(device).and_then(|network_id| {
                let firmware = self.transport.firmware_version(device)?;
                Ok(DeviceInfo { device, network_id, firmware })
            });
            match info {
                Ok(info) => {
                    info!(
                        "device 0x{:04x}, firmware {}.{}",
                        info.network_id, info.firmware.0, info.firmware.1
                    );
                    found.push(info);
                }
                Err(err) => warn!(device = %device, error = %err, "couldn't retrieve device information"),
            }
        }
        found
    }

    /// Poll every tag once, in order
    pub fn run_cycle(&mut self, cancel: &CancellationToken) -> CycleSummary {
        if !self.configured {
            self.setup();
        }

        let mut summary = CycleSummary::default();
        for tag in self.tags.clone() {
            if cancel.is_cancelled() {
                break;
            }
            let outcome = self.poll(tag);
            summary.outcomes.push((tag, outcome));
        }
        summary
    }

    /// Run cycles until `cancel` fires
    pub fn run_forever(&mut self, cancel: &CancellationToken) -> RunSummary {
        if !self.configured {
            self.setup();
        }

        let mut totals = RunSummary::default();
        while !cancel.is_cancelled() {
            let cycle = self.run_cycle(cancel);
            totals.add(&cycle);
        }
        info!(cycles = totals.cycles, fixes = totals.fixes, failures = totals.failures, "positioning stopped");
        totals
    }

    /// Run at most `count` cycles, stopping early if `cancel` fires
    pub fn run_cycles(&mut self, count: u64, cancel: &CancellationToken) -> RunSummary {
        let mut totals = RunSummary::default();
        while totals.cycles < count && !cancel.is_cancelled() {
            let cycle = self.run_cycle(cancel);
            totals.add(&cycle);
        }
        info!(cycles = totals.cycles, fixes = totals.fixes, failures = totals.failures, "positioning finished");
        totals
    }

    fn poll(&mut self, tag: DeviceId) -> TagOutcome {
        let started = Instant::now();
        let result = self.transport.do_positioning(tag, self.params);
        let received = Instant::now();

        match result {
            Ok(position) => {
                let fix = PositionFix {
                    tag,
                    position,
                    timestamp: received,
                    round_trip: received.duration_since(started),
                };
                self.route_fix(&fix)
            }
            Err(err) => {
                debug!(tag = %tag, error = %err, "fix request failed");
                TagOutcome::Failed(self.report_failure(Operation::Positioning, tag))
            }
        }
    }

    fn route_fix(&mut self, fix: &PositionFix) -> TagOutcome {
        match &mut self.route {
            FixRoute::Publish(publisher) => match publisher.publish(&mut self.sink, fix) {
                Ok(PublishOutcome::Forwarded) => TagOutcome::Published,
                Ok(PublishOutcome::Suppressed) => TagOutcome::Suppressed,
                Err(err) => {
                    warn!(tag = %fix.tag, error = %err, "failed to publish position");
                    TagOutcome::PublishFailed
                }
            },
            FixRoute::Latency(tracker) if tracker.tag() == fix.tag => {
                match tracker.record(fix.timestamp) {
                    Some(report) => {
                        info!(
                            "latency for tag {} with {} samples is now {}ms",
                            report.tag, report.sample_count, report.average_ms
                        );
                        let record = LatencyRecord {
                            id: report.tag.presentation_id(),
                            samples: report.sample_count,
                            average_ms: report.average_ms,
                        };
                        let topic = self.topics.latency();
                        if let Err(err) = publish_record(&mut self.sink, &topic, &record) {
                            warn!(error = %err, "failed to publish latency report");
                        }
                        TagOutcome::LatencyReport(report)
                    }
                    None => TagOutcome::LatencySample,
                }
            }
            FixRoute::Latency(_) => TagOutcome::Ignored,
        }
    }

    fn report_failure(&mut self, operation: Operation, tag: DeviceId) -> ErrorReport {
        let report = self.reporter.report(&mut self.transport, operation, tag);
        warn!(tag = %tag, locality = report.locality.as_str(), "{}", report.message);
        let topic = self.topics.error();
        self.emit(&topic, &report.to_record());
        report
    }

    fn emit<R: Serialize>(&mut self, topic: &str, record: &R) {
        if let Err(err) = publish_record(&mut self.sink, topic, record) {
            warn!(topic, error = %err, "failed to publish record");
        }
    }
}
