//! Simulated transport for running without hardware
//!
//! Every device answers like a healthy tag except those configured as
//! unreachable or failing. Fixes are scattered around a per-tag base position
//! with uniform noise from a seeded generator, so runs are reproducible.

use crate::core::{Coordinates, DeviceId};
use crate::hardware::{CommError, CommResult, Request, Response, Transport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Error code left in a failing device's register after a failed fix
pub const SIMULATED_POSITIONING_ERROR: u8 = 0x0b;

/// Simulator settings
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Network id reported by the attached device
    pub local_network_id: u16,
    /// Base position used for tags without an explicit one
    pub default_position: Coordinates,
    pub positions: HashMap<DeviceId, Coordinates>,
    /// Maximum deviation (mm) added to each axis
    pub noise_mm: i32,
    /// Probability that a fix request fails with a device error
    pub failure_probability: f64,
    /// Devices that never answer
    pub unreachable: HashSet<DeviceId>,
    /// Devices whose fix requests always fail
    pub failing: HashSet<DeviceId>,
    /// Blocking time of a fix request
    pub fix_delay: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            local_network_id: 0x6000,
            default_position: Coordinates::new(950, 1550, 1200),
            positions: HashMap::new(),
            noise_mm: 25,
            failure_probability: 0.0,
            unreachable: HashSet::new(),
            failing: HashSet::new(),
            fix_delay: Duration::from_millis(20),
        }
    }
}

/// Transport backed by a random but seeded device model
pub struct SimulatedTransport {
    config: SimulationConfig,
    rng: StdRng,
    error_registers: HashMap<DeviceId, u8>,
    anchor_counts: HashMap<DeviceId, usize>,
}

impl SimulatedTransport {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            error_registers: HashMap::new(),
            anchor_counts: HashMap::new(),
        }
    }

    /// Anchors currently in a device's list
    pub fn anchor_count(&self, device: DeviceId) -> usize {
        self.anchor_counts.get(&device).copied().unwrap_or(0)
    }

    fn positioning(&mut self, device: DeviceId) -> CommResult<Response> {
        if !self.config.fix_delay.is_zero() {
            std::thread::sleep(self.config.fix_delay);
        }

        let failed = self.config.failing.contains(&device)
            || self.anchor_count(device) == 0
            || self.rng.gen_bool(self.config.failure_probability.clamp(0.0, 1.0));
        if failed {
            self.error_registers.insert(device, SIMULATED_POSITIONING_ERROR);
            return Err(CommError::DeviceFailure {
                device,
                operation: "do_positioning".to_string(),
            });
        }

        let base = self
            .config
            .positions
            .get(&device)
            .copied()
            .unwrap_or(self.config.default_position);
        let noise = self.config.noise_mm.max(0);
        let mut jitter = || self.rng.gen_range(-noise..=noise);
        Ok(Response::Position(Coordinates::new(
            base.x + jitter(),
            base.y + jitter(),
            base.z + jitter(),
        )))
    }
}

impl Transport for SimulatedTransport {
    fn request(&mut self, device: DeviceId, request: Request) -> CommResult<Response> {
        if self.config.unreachable.contains(&device) {
            return Err(CommError::NoResponse { device });
        }

        match request {
            Request::ClearDevices => {
                self.anchor_counts.insert(device, 0);
                Ok(Response::Ack)
            }
            Request::AddDevice(_) => {
                *self.anchor_counts.entry(device).or_insert(0) += 1;
                Ok(Response::Ack)
            }
            Request::SetAnchorSelection { .. }
            | Request::SaveAnchorIds
            | Request::SaveRegisters(_) => Ok(Response::Ack),
            Request::DoPositioning(_) => self.positioning(device),
            Request::ReadErrorCode => Ok(Response::ErrorCode(
                self.error_registers.get(&device).copied().unwrap_or(0),
            )),
            Request::ReadNetworkId => Ok(Response::NetworkId(match device {
                DeviceId::Local => self.config.local_network_id,
                DeviceId::Remote(id) => id,
            })),
            Request::ReadFirmwareVersion => Ok(Response::FirmwareVersion(0x13)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AnchorDevice, PositioningParams};

    fn quiet_config() -> SimulationConfig {
        SimulationConfig {
            fix_delay: Duration::ZERO,
            ..SimulationConfig::default()
        }
    }

    fn with_anchor(transport: &mut SimulatedTransport, tag: DeviceId) {
        let anchor = AnchorDevice::new(0xa000, 1, Coordinates::new(0, 0, 2500));
        transport.add_device(tag, anchor).unwrap();
    }

    #[test]
    fn test_fix_stays_within_noise_band() {
        let tag = DeviceId::Remote(0x1000);
        let mut transport = SimulatedTransport::new(quiet_config());
        with_anchor(&mut transport, tag);

        for _ in 0..20 {
            let fix = transport.do_positioning(tag, PositioningParams::default()).unwrap();
            assert!((fix.x - 950).abs() <= 25);
            assert!((fix.y - 1550).abs() <= 25);
            assert!((fix.z - 1200).abs() <= 25);
        }
    }

    #[test]
    fn test_same_seed_same_fixes() {
        let tag = DeviceId::Remote(0x1000);
        let mut a = SimulatedTransport::new(quiet_config());
        let mut b = SimulatedTransport::new(quiet_config());
        with_anchor(&mut a, tag);
        with_anchor(&mut b, tag);

        let params = PositioningParams::default();
        for _ in 0..5 {
            assert_eq!(a.do_positioning(tag, params).unwrap(), b.do_positioning(tag, params).unwrap());
        }
    }

    #[test]
    fn test_unconfigured_tag_fails_and_sets_error_register() {
        let tag = DeviceId::Remote(0x1001);
        let mut transport = SimulatedTransport::new(quiet_config());

        let result = transport.do_positioning(tag, PositioningParams::default());
        assert!(matches!(result, Err(CommError::DeviceFailure { .. })));
        assert_eq!(transport.error_code(tag).unwrap(), SIMULATED_POSITIONING_ERROR);
    }

    #[test]
    fn test_clear_resets_anchor_count() {
        let tag = DeviceId::Remote(0x1000);
        let mut transport = SimulatedTransport::new(quiet_config());
        with_anchor(&mut transport, tag);
        with_anchor(&mut transport, tag);
        assert_eq!(transport.anchor_count(tag), 2);

        transport.clear_devices(tag).unwrap();
        assert_eq!(transport.anchor_count(tag), 0);
    }
}
