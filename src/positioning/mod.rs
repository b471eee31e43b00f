//! Positioning orchestration: anchor configuration, fix polling and routing

pub mod configurator;
pub mod latency;
pub mod publisher;
pub mod error_reporter;
pub mod scheduler;
pub mod cancel;

pub use configurator::{
    selection_for, AnchorConfigurator, ConfigStep, ConfigurationResult, StepOutcome,
};
pub use latency::{LatencyReport, LatencyTracker};
pub use publisher::{PositionPublisher, PublishOutcome};
pub use error_reporter::{ErrorReport, ErrorReporter, Locality, Operation};
pub use scheduler::{
    CycleSummary, DeviceInfo, PositioningScheduler, RunMode, RunSummary, SchedulerSettings,
    TagOutcome,
};
pub use cancel::CancellationToken;
