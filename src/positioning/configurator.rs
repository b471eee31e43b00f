//! Anchor configuration of a tag's device list
//!
//! Every step is attempted even when an earlier one failed: a tag with a
//! partial anchor list can still range against the anchors it did receive.
//! The aggregate success is the AND of all non-persist steps.

use crate::core::{
    AnchorDevice, DeviceId, SelectionMode, MANUAL_SELECTION_MAX_ANCHORS, MIN_ANCHORS,
};
use crate::hardware::{CommError, Register, Transport};
use tracing::{debug, warn};

/// Selection change a list of `anchor_count` anchors requires, if any.
///
/// Manual mode keeps at most four anchors active, so only longer lists leave it.
pub fn selection_for(anchor_count: usize) -> Option<(SelectionMode, usize)> {
    if anchor_count > MANUAL_SELECTION_MAX_ANCHORS {
        Some((SelectionMode::Automatic, anchor_count))
    } else {
        None
    }
}

/// One step of a configuration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStep {
    ClearDevices,
    AddAnchor(u16),
    SelectAutomatic(usize),
    SaveAnchorIds,
    SaveRegisters,
}

impl ConfigStep {
    /// Persist steps are fire-and-forget and never affect the aggregate
    pub fn is_persist(&self) -> bool {
        matches!(self, ConfigStep::SaveAnchorIds | ConfigStep::SaveRegisters)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub step: ConfigStep,
    pub error: Option<CommError>,
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of configuring one tag
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationResult {
    pub tag: DeviceId,
    /// AND of every non-persist step
    pub success: bool,
    /// Every attempted step, in order
    pub steps: Vec<StepOutcome>,
}

impl ConfigurationResult {
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|outcome| !outcome.succeeded())
    }
}

/// Pushes the anchor list into a tag's device list
#[derive(Debug, Clone, Default)]
pub struct AnchorConfigurator {
    persist: bool,
}

impl AnchorConfigurator {
    /// `persist` also saves the anchor ids and anchor count to the tag's flash
    pub fn new(persist: bool) -> Self {
        Self { persist }
    }

    /// Replace `tag`'s device list with `anchors`
    pub fn configure<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        tag: DeviceId,
        anchors: &[AnchorDevice],
    ) -> ConfigurationResult {
        if anchors.len() < MIN_ANCHORS {
            warn!(
                tag = %tag,
                anchors = anchors.len(),
                "fewer than {} anchors configured, positioning will be degraded",
                MIN_ANCHORS
            );
        }

        let mut steps = Vec::with_capacity(anchors.len() + 4);

        steps.push(outcome(ConfigStep::ClearDevices, transport.clear_devices(tag)));

        // Automatic selection must be in place before the fifth add
        if let Some((mode, count)) = selection_for(anchors.len()) {
            let result = transport.set_selection_of_anchors(tag, mode, count);
            steps.push(outcome(ConfigStep::SelectAutomatic(count), result));
        }

        for anchor in anchors {
            let result = transport.add_device(tag, *anchor);
            steps.push(outcome(ConfigStep::AddAnchor(anchor.network_id), result));
        }

        if self.persist {
            steps.push(outcome(ConfigStep::SaveAnchorIds, transport.save_anchor_ids(tag)));
            let result = transport.save_registers(tag, vec![Register::PositioningNumberOfAnchors]);
            steps.push(outcome(ConfigStep::SaveRegisters, result));
        }

        let success = steps
            .iter()
            .filter(|outcome| !outcome.step.is_persist())
            .fold(true, |acc, outcome| acc & outcome.succeeded());

        for failed in steps.iter().filter(|o| !o.succeeded()) {
            debug!(tag = %tag, step = ?failed.step, error = ?failed.error, "configuration step failed");
        }

        ConfigurationResult { tag, success, steps }
    }
}

fn outcome(step: ConfigStep, result: Result<(), CommError>) -> StepOutcome {
    StepOutcome {
        step,
        error: result.err(),
    }
}
