//! Static configuration loaded at process start

use crate::api::Topics;
use crate::core::{
    AnchorDevice, Coordinates, DeviceId, Dimension, PositioningParams, DEFAULT_LATENCY_SAMPLES,
    DEFAULT_TOPIC_PREFIX, MIN_ANCHORS, MIN_ANCHOR_SPACING_MM,
};
use crate::hardware::TableErrorDecoder;
use crate::positioning::{RunMode, SchedulerSettings};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Relative singular-value threshold below which a direction counts as flat
const RANK_TOLERANCE: f64 = 1e-6;

/// Run mode as written in the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeConfig {
    Publish,
    Latency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyConfig {
    /// Tag whose inter-fix intervals are measured
    pub tag: DeviceId,
    /// Intervals averaged per report
    pub samples: usize,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            tag: DeviceId::Remote(0x1000),
            samples: DEFAULT_LATENCY_SAMPLES,
        }
    }
}

/// Everything the positioning loop needs, read once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Anchors pushed to every tag, in order
    pub anchors: Vec<AnchorDevice>,
    /// Tags polled each cycle, in order; `null` is the local device
    pub tags: Vec<DeviceId>,
    pub positioning: PositioningParams,
    pub mode: ModeConfig,
    /// Tags whose fixes are published; empty publishes all
    pub visibility: Vec<DeviceId>,
    pub latency: LatencyConfig,
    /// Save anchor ids and anchor count to the tags' flash
    pub persist_to_flash: bool,
    pub topic_prefix: String,
    /// Messages for device error codes (decimal keys)
    pub error_messages: HashMap<u8, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            anchors: vec![
                AnchorDevice::new(0xa000, 1, Coordinates::new(0, 0, 2500)),
                AnchorDevice::new(0x6968, 1, Coordinates::new(0, 3100, 2500)),
                AnchorDevice::new(0x6945, 1, Coordinates::new(1900, 0, 2500)),
                AnchorDevice::new(0x696b, 1, Coordinates::new(1900, 3100, 2500)),
            ],
            tags: vec![DeviceId::Remote(0x1000)],
            positioning: PositioningParams::default(),
            mode: ModeConfig::Publish,
            visibility: vec![DeviceId::Remote(0x1000)],
            latency: LatencyConfig::default(),
            persist_to_flash: false,
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            error_messages: HashMap::new(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("invalid {parameter}: {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("anchor 0x{anchor_id:04x} is listed more than once")]
    DuplicateAnchor { anchor_id: u16 },

    #[error("tag {tag} is listed more than once")]
    DuplicateTag { tag: DeviceId },
}

/// Outcome of [`AppConfig::validate`]
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl AppConfig {
    /// Read and validate a JSON configuration file. Warnings are logged.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let validation = config.validate();
        for warning in &validation.warnings {
            warn!("{}", warning);
        }
        if let Some(error) = validation.errors.into_iter().next() {
            return Err(error);
        }
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.tags.is_empty() {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "tags".to_string(),
                reason: "at least one tag is required".to_string(),
            });
        }

        let mut seen_tags = HashSet::new();
        for tag in &self.tags {
            if !seen_tags.insert(*tag) {
                result.errors.push(ConfigError::DuplicateTag { tag: *tag });
            }
        }

        let mut seen_anchors = HashSet::new();
        for anchor in &self.anchors {
            if !seen_anchors.insert(anchor.network_id) {
                result.errors.push(ConfigError::DuplicateAnchor {
                    anchor_id: anchor.network_id,
                });
            }
        }

        match self.mode {
            ModeConfig::Latency => {
                if self.latency.samples == 0 {
                    result.errors.push(ConfigError::InvalidParameter {
                        parameter: "latency.samples".to_string(),
                        reason: "must be at least 1".to_string(),
                    });
                }
                if !self.tags.contains(&self.latency.tag) {
                    result.warnings.push(format!(
                        "latency tag {} is not polled, no latency will be reported",
                        self.latency.tag
                    ));
                }
                if !self.visibility.is_empty() {
                    result
                        .warnings
                        .push("visibility list is ignored in latency mode".to_string());
                }
            }
            ModeConfig::Publish => {
                for tag in self.visibility.iter().filter(|t| !self.tags.contains(t)) {
                    result
                        .warnings
                        .push(format!("visible tag {} is not polled", tag));
                }
            }
        }

        result.warnings.extend(anchor_geometry_warnings(&self.anchors, self.positioning.dimension));
        result
    }

    pub fn run_mode(&self) -> RunMode {
        match self.mode {
            ModeConfig::Publish => RunMode::Publish,
            ModeConfig::Latency => RunMode::Latency {
                tag: self.latency.tag,
                sample_count: self.latency.samples,
            },
        }
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            tags: self.tags.clone(),
            anchors: self.anchors.clone(),
            params: self.positioning,
            mode: self.run_mode(),
            visibility: self.visibility.clone(),
            persist: self.persist_to_flash,
            topics: Topics::new(self.topic_prefix.clone()),
        }
    }

    pub fn error_decoder(&self) -> TableErrorDecoder {
        TableErrorDecoder::new(self.error_messages.clone())
    }
}

/// Warnings about an anchor set that will degrade or prevent positioning
pub fn anchor_geometry_warnings(anchors: &[AnchorDevice], dimension: Dimension) -> Vec<String> {
    let mut warnings = Vec::new();

    if anchors.len() < MIN_ANCHORS {
        warnings.push(format!(
            "only {} anchors configured, at least {} are needed for positioning",
            anchors.len(),
            MIN_ANCHORS
        ));
    }

    if anchors.len() >= 2 {
        let spacing = minimum_spacing_mm(anchors);
        if spacing < MIN_ANCHOR_SPACING_MM {
            warnings.push(format!(
                "anchors only {:.0}mm apart, ranging will not separate them",
                spacing
            ));
        }
    }

    if anchors.len() >= MIN_ANCHORS {
        let rank = geometry_rank(anchors);
        if rank < 2 {
            warnings.push("anchors are collinear, positions will be ambiguous".to_string());
        } else if rank < 3 && dimension == Dimension::ThreeD {
            warnings.push(
                "anchors are coplanar, 3D fixes will have a poor vertical estimate".to_string(),
            );
        }
    }

    warnings
}

fn minimum_spacing_mm(anchors: &[AnchorDevice]) -> f64 {
    let mut min_distance = f64::INFINITY;
    for (i, a) in anchors.iter().enumerate() {
        for b in &anchors[i + 1..] {
            let dx = (a.position.x - b.position.x) as f64;
            let dy = (a.position.y - b.position.y) as f64;
            let dz = (a.position.z - b.position.z) as f64;
            min_distance = min_distance.min((dx * dx + dy * dy + dz * dz).sqrt());
        }
    }
    min_distance
}

/// Dimension of the affine hull spanned by the anchors (0 to 3)
fn geometry_rank(anchors: &[AnchorDevice]) -> usize {
    let n = anchors.len() as f64;
    let centroid = anchors.iter().fold([0.0; 3], |acc, a| {
        [
            acc[0] + a.position.x as f64 / n,
            acc[1] + a.position.y as f64 / n,
            acc[2] + a.position.z as f64 / n,
        ]
    });

    let centered = DMatrix::from_fn(anchors.len(), 3, |row, col| {
        let p = anchors[row].position;
        let value = match col {
            0 => p.x,
            1 => p.y,
            _ => p.z,
        };
        value as f64 - centroid[col]
    });

    let singular = centered.singular_values();
    let largest = singular.max();
    if largest <= 0.0 {
        return 0;
    }
    singular.iter().filter(|s| **s > largest * RANK_TOLERANCE).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn anchor(id: u16, x: i32, y: i32, z: i32) -> AnchorDevice {
        AnchorDevice::new(id, 1, Coordinates::new(x, y, z))
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        let result = config.validate();
        assert!(result.is_valid());
        assert_eq!(config.anchors.len(), 4);
        assert_eq!(config.run_mode(), RunMode::Publish);
    }

    #[test]
    fn test_default_anchors_are_coplanar_in_3d() {
        let warnings = anchor_geometry_warnings(&AppConfig::default().anchors, Dimension::ThreeD);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("coplanar"));

        let warnings = anchor_geometry_warnings(&AppConfig::default().anchors, Dimension::TwoD);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_collinear_anchors_warn() {
        let anchors = vec![anchor(1, 0, 0, 0), anchor(2, 1000, 0, 0), anchor(3, 2000, 0, 0)];
        let warnings = anchor_geometry_warnings(&anchors, Dimension::TwoD);
        assert!(warnings.iter().any(|w| w.contains("collinear")));
    }

    #[test]
    fn test_too_few_and_too_close_anchors_warn() {
        let anchors = vec![anchor(1, 0, 0, 0), anchor(2, 50, 0, 0)];
        let warnings = anchor_geometry_warnings(&anchors, Dimension::ThreeD);
        assert!(warnings.iter().any(|w| w.contains("only 2 anchors")));
        assert!(warnings.iter().any(|w| w.contains("50mm")));
    }

    #[test]
    fn test_spread_anchors_have_full_rank() {
        let anchors = vec![
            anchor(1, 0, 0, 0),
            anchor(2, 3000, 0, 500),
            anchor(3, 0, 3000, 2500),
            anchor(4, 3000, 3000, 1200),
        ];
        assert_eq!(geometry_rank(&anchors), 3);
        assert!(anchor_geometry_warnings(&anchors, Dimension::ThreeD).is_empty());
    }

    #[test]
    fn test_duplicates_are_errors() {
        let mut config = AppConfig::default();
        config.anchors.push(anchor(0xa000, 5, 5, 5));
        config.tags.push(DeviceId::Remote(0x1000));

        let result = config.validate();
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, ConfigError::DuplicateAnchor { anchor_id: 0xa000 })));
        assert!(result.errors.iter().any(|e| matches!(e, ConfigError::DuplicateTag { .. })));
    }

    #[test]
    fn test_latency_mode_checks() {
        let mut config = AppConfig {
            mode: ModeConfig::Latency,
            ..AppConfig::default()
        };
        config.latency.samples = 0;
        config.latency.tag = DeviceId::Remote(0x2000);

        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("not polled")));
        assert!(result.warnings.iter().any(|w| w.contains("ignored in latency mode")));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let json = r#"{ "tags": [null, 4097], "mode": "latency", "latency": { "tag": 4097, "samples": 10 } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.tags, vec![DeviceId::Local, DeviceId::Remote(0x1001)]);
        assert_eq!(config.anchors.len(), 4);
        assert_eq!(
            config.run_mode(),
            RunMode::Latency {
                tag: DeviceId::Remote(0x1001),
                sample_count: 10
            }
        );
    }

    #[test]
    fn test_error_messages_use_decimal_keys() {
        let json = r#"{ "error_messages": { "11": "not enough anchors" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        use crate::hardware::ErrorDecoder;
        assert_eq!(config.error_decoder().decode(11), "not enough anchors");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = env::temp_dir().join(format!("multitag_config_{}.json", std::process::id()));
        let config = AppConfig {
            persist_to_flash: true,
            tags: vec![DeviceId::Local, DeviceId::Remote(0x1000)],
            ..AppConfig::default()
        };

        config.save_to_file(&path).unwrap();
        let loaded = AppConfig::load_from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = env::temp_dir().join(format!("multitag_invalid_{}.json", std::process::id()));
        fs::write(&path, r#"{ "tags": [] }"#).unwrap();

        let result = AppConfig::load_from_file(&path);
        fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = AppConfig::load_from_file("/nonexistent/multitag.json");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
